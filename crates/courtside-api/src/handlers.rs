//! Route handler functions for all API endpoints.
//!
//! Flow endpoints accept JSON, pass an explicit `FlowContext` built from the
//! request headers to the orchestrator, and return the validated output.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use courtside_core::types::FlowContext;
use courtside_flows::flows::weekend_planner::{self, WeekendPlan, WeekendPlannerFlow};
use courtside_flows::FlowDescriptor;

use crate::error::ApiError;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub backend: String,
    pub flows: usize,
}

#[derive(Debug, Serialize)]
pub struct FlowsResponse {
    pub flows: Vec<FlowDescriptor>,
}

/// Body of POST /plan-weekend. Facilities and currency come from the server.
#[derive(Debug, Deserialize)]
pub struct PlanWeekendRequest {
    pub request: String,
}

// =============================================================================
// Helpers
// =============================================================================

/// Build the invocation context from `x-user-id` and `x-request-id`.
/// A missing or malformed request id gets a fresh one.
pub fn flow_context(headers: &HeaderMap) -> FlowContext {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .unwrap_or_else(Uuid::new_v4);

    FlowContext {
        user_id,
        request_id,
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        backend: state.orchestrator.backend_name().to_string(),
        flows: state.orchestrator.names().len(),
    }))
}

/// GET /flows - registered flows with their input and output JSON Schemas.
pub async fn list_flows(State(state): State<AppState>) -> Result<Json<FlowsResponse>, ApiError> {
    Ok(Json(FlowsResponse {
        flows: state.orchestrator.descriptors(),
    }))
}

/// POST /flows/{name} - run a flow on a JSON input.
pub async fn run_flow(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let input = json_body(payload)?;
    let ctx = flow_context(&headers);
    let output = state.orchestrator.run_json(&name, input, &ctx).await?;
    Ok(Json(output))
}

/// POST /plan-weekend - weekend planner fed with the platform's facilities.
pub async fn plan_weekend(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PlanWeekendRequest>, JsonRejection>,
) -> Result<Json<WeekendPlan>, ApiError> {
    let body = json_body(payload)?;
    let ctx = flow_context(&headers);
    let input = weekend_planner::build_input(body.request, state.data_source.as_ref()).await?;
    let plan = state
        .orchestrator
        .run::<WeekendPlannerFlow>(&input, &ctx)
        .await?;
    Ok(Json(plan))
}

/// GET /tools/{name} - run an aggregation tool directly.
pub async fn run_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let output = state.orchestrator.tools().invoke(&name).await?;
    Ok(Json(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_flow_context_from_headers() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("user-2"));
        headers.insert(
            REQUEST_ID_HEADER,
            HeaderValue::from_str(&id.to_string()).unwrap(),
        );

        let ctx = flow_context(&headers);
        assert_eq!(ctx.user_id.as_deref(), Some("user-2"));
        assert_eq!(ctx.request_id, id);
    }

    #[test]
    fn test_flow_context_defaults() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("  "));
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("not-a-uuid"));

        let ctx = flow_context(&headers);
        assert_eq!(ctx.user_id, None);
        assert!(!ctx.request_id.is_nil());
    }
}
