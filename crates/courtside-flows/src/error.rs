//! Error types for the flow layer.

use std::time::Duration;

use courtside_core::error::CourtsideError;

use crate::schema::ValidationError;
use crate::state::FlowState;

/// Errors from parsing or rendering a prompt template.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("Unclosed block: {{{{#{0}}}}}")]
    Unclosed(String),
    #[error("Closing tag without an open block: {{{{/{0}}}}}")]
    UnexpectedClose(String),
    #[error("Block {{{{#{opened}}}}} closed by {{{{/{closed}}}}}")]
    MismatchedClose { opened: String, closed: String },
    #[error("Empty tag")]
    EmptyTag,
    #[error("Unsupported block: {0}")]
    UnknownBlock(String),
    #[error("Template references missing field: {0}")]
    MissingField(String),
    #[error("Field is not a list: {0}")]
    NotAList(String),
}

/// Errors from tool lookup or execution.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Tool {tool} is not available to flow {flow}")]
    NotPermitted { tool: String, flow: String },
    #[error("Data source error: {0}")]
    DataUnavailable(#[from] CourtsideError),
    #[error("Tool produced invalid output: {0}")]
    InvalidOutput(ValidationError),
}

/// Errors from the generative backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Generative backend is not configured")]
    NotConfigured,
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Backend returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Backend returned no content")]
    EmptyResponse,
    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Model requested more than {0} tool rounds")]
    TooManyToolRounds(u32),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Http(format!("request timed out: {}", err))
        } else {
            BackendError::Http(err.to_string())
        }
    }
}

/// Every way a flow invocation can fail.
///
/// Callers branch on the variant; `kind()` gives the stable wire code.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Unknown flow: {0}")]
    UnknownFlow(String),
    #[error("Invalid input: {0}")]
    InputValidation(ValidationError),
    #[error("Prompt rendering failed: {0}")]
    PromptRender(#[from] TemplateError),
    #[error("Tool execution failed: {0}")]
    ToolExecution(#[from] ToolError),
    /// Displays a generic message. The backend cause is the error source.
    #[error("Generation failed")]
    ModelGeneration(#[source] BackendError),
    #[error("Model output did not match the expected shape: {0}")]
    OutputValidation(ValidationError),
    #[error("Invalid flow state transition: {0} -> {1}")]
    InvalidTransition(FlowState, FlowState),
    #[error("Invalid flow definition: {0}")]
    Definition(String),
}

impl From<BackendError> for FlowError {
    fn from(err: BackendError) -> Self {
        FlowError::ModelGeneration(err)
    }
}

impl FlowError {
    /// Stable machine-readable code.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::UnknownFlow(_) => "unknown_flow",
            FlowError::InputValidation(_) => "input_validation",
            FlowError::PromptRender(_) => "prompt_render",
            FlowError::ToolExecution(_) => "tool_execution",
            FlowError::ModelGeneration(_) => "model_generation",
            FlowError::OutputValidation(_) => "output_validation",
            FlowError::InvalidTransition(..) => "invalid_transition",
            FlowError::Definition(_) => "definition",
        }
    }

    /// Field issues, for the two validation variants.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            FlowError::InputValidation(v) | FlowError::OutputValidation(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::schema::IssueKind;

    #[test]
    fn test_template_error_display() {
        assert_eq!(
            TemplateError::Unclosed("each".to_string()).to_string(),
            "Unclosed block: {{#each}}"
        );
        assert_eq!(
            TemplateError::MismatchedClose {
                opened: "if".to_string(),
                closed: "each".to_string()
            }
            .to_string(),
            "Block {{#if}} closed by {{/each}}"
        );
        assert_eq!(
            TemplateError::MissingField("reviews".to_string()).to_string(),
            "Template references missing field: reviews"
        );
    }

    #[test]
    fn test_model_generation_is_generic_with_source() {
        let err: FlowError = BackendError::Api {
            status: 429,
            message: "quota exceeded".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Generation failed");
        assert_eq!(err.kind(), "model_generation");
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "Backend returned 429: quota exceeded");
    }

    #[test]
    fn test_tool_error_from_courtside_error() {
        let err: ToolError = CourtsideError::DataUnavailable("db offline".to_string()).into();
        assert!(matches!(err, ToolError::DataUnavailable(_)));
        let flow_err: FlowError = err.into();
        assert_eq!(flow_err.kind(), "tool_execution");
    }

    #[test]
    fn test_validation_accessor() {
        let err = FlowError::InputValidation(ValidationError::single(
            "preferences",
            IssueKind::Missing,
        ));
        assert_eq!(err.validation().unwrap().issues.len(), 1);
        assert_eq!(
            err.to_string(),
            "Invalid input: preferences: required field is missing"
        );
        assert!(FlowError::UnknownFlow("x".into()).validation().is_none());
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = FlowError::InvalidTransition(FlowState::Done, FlowState::Generating);
        assert_eq!(
            err.to_string(),
            "Invalid flow state transition: done -> generating"
        );
    }
}
