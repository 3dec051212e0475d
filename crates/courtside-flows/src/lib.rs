pub mod backend;
pub mod error;
pub mod flows;
pub mod gemini;
pub mod orchestrator;
pub mod prompt;
pub mod schema;
pub mod state;
pub mod tools;

pub use backend::{
    DisabledBackend, GenerationRequest, GenerativeBackend, ModelTurn, ScriptedBackend, ToolCall,
};
pub use error::{BackendError, FlowError, TemplateError, ToolError};
pub use flows::Flow;
pub use gemini::GeminiBackend;
pub use orchestrator::{FlowDescriptor, FlowOrchestrator, FlowSpec};
pub use schema::{Field, Shape, ValidationError};
pub use state::FlowState;
pub use tools::{ToolRegistry, ToolSpec};
