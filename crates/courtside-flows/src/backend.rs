//! Generative backend abstraction.
//!
//! A backend receives the rendered prompt, the output JSON Schema, the tool
//! declarations and the transcript of tool calls made so far, and answers
//! with either more tool calls or a final structured response.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::BackendError;
use crate::tools::ToolDeclaration;

/// Output field image flows put the generated data URI in.
pub const IMAGE_DATA_URI_FIELD: &str = "imageDataUri";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    #[default]
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            arguments: json!({}),
        }
    }
}

/// One executed tool call and its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Tool round the call belongs to, starting at 1.
    pub round: u32,
    pub call: ToolCall,
    pub output: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub flow: String,
    pub prompt: String,
    pub output_schema: Value,
    pub tools: Vec<ToolDeclaration>,
    pub transcript: Vec<TranscriptEntry>,
    pub modality: Modality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ModelTurn {
    ToolCalls(Vec<ToolCall>),
    Final(Value),
}

#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<ModelTurn, BackendError>;
}

// =============================================================================
// Disabled backend
// =============================================================================

/// Backend used when no provider is configured. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBackend;

#[async_trait]
impl GenerativeBackend for DisabledBackend {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<ModelTurn, BackendError> {
        Err(BackendError::NotConfigured)
    }
}

// =============================================================================
// Scripted backend
// =============================================================================

/// Replays a fixed sequence of turns and records every request it sees.
///
/// Once the script runs out every call fails with `EmptyResponse`.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    turns: Mutex<VecDeque<Result<ModelTurn, BackendError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, turn: Result<ModelTurn, BackendError>) -> Self {
        if let Ok(turns) = self.turns.get_mut() {
            turns.push_back(turn);
        }
        self
    }

    /// Answer with a final structured response.
    pub fn then_final(self, value: Value) -> Self {
        self.push(Ok(ModelTurn::Final(value)))
    }

    /// Ask for the named tools, one call each.
    pub fn then_tools(self, names: &[&str]) -> Self {
        let calls = names.iter().map(|n| ToolCall::new(*n)).collect();
        self.push(Ok(ModelTurn::ToolCalls(calls)))
    }

    pub fn then_error(self, err: BackendError) -> Self {
        self.push(Err(err))
    }

    /// Sleep this long before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ModelTurn, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .turns
            .lock()
            .map_err(|_| BackendError::MalformedResponse("script lock poisoned".to_string()))?
            .pop_front();
        next.unwrap_or(Err(BackendError::EmptyResponse))
    }
}
