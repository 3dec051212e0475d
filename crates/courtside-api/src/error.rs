//! API error types and JSON error response formatting.
//!
//! Every failure leaves the server as `{error, message, details}`. Flow
//! failures keep their kind as the error code, and validation failures list
//! the offending fields in `details`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use courtside_core::error::CourtsideError;
use courtside_flows::{FlowError, ToolError};

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g. "not_found", "input_validation").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug)]
pub enum ApiError {
    /// 400 - body is not JSON or misses required request fields.
    BadRequest(String),
    /// 404
    NotFound(String),
    /// 429 - rate limit exceeded.
    TooManyRequests,
    /// 500
    Internal(String),
    /// 502 - a tool or upstream dependency failed.
    BadGateway(String),
    /// 503 - data source unreachable.
    ServiceUnavailable(String),
    /// A flow invocation failed; status depends on the failure kind.
    Flow(FlowError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Flow(err) => flow_status(err),
        }
    }
}

fn flow_status(err: &FlowError) -> StatusCode {
    match err {
        FlowError::UnknownFlow(_) => StatusCode::NOT_FOUND,
        FlowError::InputValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FlowError::ToolExecution(_) | FlowError::ModelGeneration(_) => StatusCode::BAD_GATEWAY,
        FlowError::PromptRender(_)
        | FlowError::OutputValidation(_)
        | FlowError::InvalidTransition(..)
        | FlowError::Definition(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequest(msg) => ErrorBody::new("bad_request", msg),
            ApiError::NotFound(msg) => ErrorBody::new("not_found", msg),
            ApiError::TooManyRequests => {
                ErrorBody::new("too_many_requests", "Rate limit exceeded".to_string())
            }
            ApiError::Internal(msg) => ErrorBody::new("internal_error", msg),
            ApiError::BadGateway(msg) => ErrorBody::new("bad_gateway", msg),
            ApiError::ServiceUnavailable(msg) => ErrorBody::new("service_unavailable", msg),
            ApiError::Flow(err) => ErrorBody {
                error: err.kind().to_string(),
                message: err.to_string(),
                details: err.validation().map(|v| json!({ "issues": v.issues })),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl ErrorBody {
    fn new(error: &str, message: String) -> Self {
        Self {
            error: error.to_string(),
            message,
            details: None,
        }
    }
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        ApiError::Flow(err)
    }
}

impl From<ToolError> for ApiError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::UnknownTool(name) => ApiError::NotFound(format!("Unknown tool: {}", name)),
            other => ApiError::BadGateway(other.to_string()),
        }
    }
}

impl From<CourtsideError> for ApiError {
    fn from(err: CourtsideError) -> Self {
        match &err {
            CourtsideError::DataUnavailable(_) | CourtsideError::Storage(_) => {
                ApiError::ServiceUnavailable(err.to_string())
            }
            CourtsideError::NotFound(msg) => ApiError::NotFound(msg.clone()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
