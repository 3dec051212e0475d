//! Flow orchestrator: validates input, renders the prompt, drives the
//! generate/tool-call loop and validates the model's output.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, info_span, warn, Instrument};

use courtside_core::config::FlowsConfig;
use courtside_core::types::FlowContext;

use crate::backend::{GenerationRequest, GenerativeBackend, Modality, ModelTurn, TranscriptEntry};
use crate::error::{BackendError, FlowError, ToolError};
use crate::flows::{self, Flow};
use crate::prompt::PromptTemplate;
use crate::schema::Shape;
use crate::state::{FlowRun, FlowState};
use crate::tools::ToolRegistry;

/// Returns a finished output to skip generation entirely.
pub type ShortCircuit = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Everything needed to run one named flow. Immutable once registered.
pub struct FlowSpec {
    pub name: String,
    pub description: String,
    pub input: Shape,
    pub output: Shape,
    pub template: PromptTemplate,
    /// Names of the tools the model may call during this flow.
    pub tools: Vec<String>,
    pub modality: Modality,
    pub short_circuit: Option<ShortCircuit>,
}

impl FlowSpec {
    /// Build a text flow with no tools. The template is parsed here and may
    /// only read fields declared by `input`.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input: Shape,
        output: Shape,
        template: &str,
    ) -> Result<Self, FlowError> {
        let template = PromptTemplate::parse(template)?;
        template.check_fields(&input)?;
        Ok(Self {
            name: name.into(),
            description: description.into(),
            input,
            output,
            template,
            tools: Vec::new(),
            modality: Modality::Text,
            short_circuit: None,
        })
    }

    pub fn with_tools(mut self, tools: &[&str]) -> Self {
        self.tools = tools.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_modality(mut self, modality: Modality) -> Self {
        self.modality = modality;
        self
    }

    pub fn with_short_circuit(
        mut self,
        hook: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.short_circuit = Some(Arc::new(hook));
        self
    }

    pub fn descriptor(&self) -> FlowDescriptor {
        FlowDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input.to_json_schema(),
            output_schema: self.output.to_json_schema(),
            tools: self.tools.clone(),
        }
    }
}

impl fmt::Debug for FlowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowSpec")
            .field("name", &self.name)
            .field("tools", &self.tools)
            .field("modality", &self.modality)
            .field("short_circuit", &self.short_circuit.is_some())
            .finish_non_exhaustive()
    }
}

/// Public description of a registered flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
    pub tools: Vec<String>,
}

/// Runs registered flows against one tool registry and one backend.
///
/// Shared read-only behind `Arc`; each invocation carries its own state.
pub struct FlowOrchestrator {
    flows: HashMap<String, Arc<FlowSpec>>,
    tools: Arc<ToolRegistry>,
    backend: Arc<dyn GenerativeBackend>,
    limits: FlowsConfig,
}

impl FlowOrchestrator {
    pub fn new(
        tools: Arc<ToolRegistry>,
        backend: Arc<dyn GenerativeBackend>,
        limits: FlowsConfig,
    ) -> Self {
        Self {
            flows: HashMap::new(),
            tools,
            backend,
            limits,
        }
    }

    /// Orchestrator with the five booking flows registered.
    pub fn with_defaults(
        tools: Arc<ToolRegistry>,
        backend: Arc<dyn GenerativeBackend>,
        limits: FlowsConfig,
    ) -> Result<Self, FlowError> {
        let mut orchestrator = Self::new(tools, backend, limits);
        for spec in flows::default_specs(&orchestrator.limits)? {
            orchestrator.register(spec)?;
        }
        Ok(orchestrator)
    }

    /// Register a flow. Every tool it names must already be in the registry.
    pub fn register(&mut self, spec: FlowSpec) -> Result<(), FlowError> {
        if self.flows.contains_key(&spec.name) {
            return Err(FlowError::Definition(format!(
                "flow {} is already registered",
                spec.name
            )));
        }
        if let Some(missing) = spec.tools.iter().find(|t| !self.tools.contains(t)) {
            return Err(FlowError::Definition(format!(
                "flow {} references unknown tool {}",
                spec.name, missing
            )));
        }

        info!(flow = %spec.name, tools = spec.tools.len(), "Registered flow");
        self.flows.insert(spec.name.clone(), Arc::new(spec));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FlowSpec> {
        self.flows.get(name).map(Arc::as_ref)
    }

    /// Registered flow names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.flows.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Descriptors for every registered flow, sorted by name.
    pub fn descriptors(&self) -> Vec<FlowDescriptor> {
        self.names()
            .into_iter()
            .filter_map(|n| self.get(n))
            .map(FlowSpec::descriptor)
            .collect()
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Run a typed flow.
    pub async fn run<F: Flow>(
        &self,
        input: &F::Input,
        ctx: &FlowContext,
    ) -> Result<F::Output, FlowError> {
        let input = serde_json::to_value(input)
            .map_err(|e| FlowError::Definition(format!("cannot serialize input: {}", e)))?;
        let output = self.run_json(F::NAME, input, ctx).await?;
        serde_json::from_value(output)
            .map_err(|e| FlowError::Definition(format!("cannot deserialize output: {}", e)))
    }

    /// Run a flow by name on raw JSON input.
    pub async fn run_json(
        &self,
        name: &str,
        input: Value,
        ctx: &FlowContext,
    ) -> Result<Value, FlowError> {
        let spec = self
            .flows
            .get(name)
            .cloned()
            .ok_or_else(|| FlowError::UnknownFlow(name.to_string()))?;

        let span = info_span!(
            "flow",
            flow = %spec.name,
            request_id = %ctx.request_id,
            user_id = ctx.user_id.as_deref().unwrap_or("anonymous"),
        );
        self.execute(&spec, input).instrument(span).await
    }

    async fn execute(&self, spec: &FlowSpec, input: Value) -> Result<Value, FlowError> {
        let mut run = FlowRun::new();
        let result = self.drive(spec, input, &mut run).await;

        match &result {
            Ok(_) => info!(states = ?run.history(), "Flow completed"),
            Err(e) => {
                let failed_in = run.state();
                run.fail();
                let cause = std::error::Error::source(e).map(|s| s.to_string());
                warn!(
                    state = %failed_in,
                    kind = e.kind(),
                    error = %e,
                    cause = ?cause,
                    "Flow failed"
                );
            }
        }
        result
    }

    async fn drive(
        &self,
        spec: &FlowSpec,
        input: Value,
        run: &mut FlowRun,
    ) -> Result<Value, FlowError> {
        // Validate input
        let input = spec
            .input
            .validate(&input)
            .map_err(FlowError::InputValidation)?;

        if let Some(ref hook) = spec.short_circuit {
            if let Some(output) = hook(&input) {
                let output = spec
                    .output
                    .validate(&output)
                    .map_err(FlowError::OutputValidation)?;
                run.advance(FlowState::Done)?;
                debug!("Short-circuited before generation");
                return Ok(output);
            }
        }

        // Render prompt
        run.advance(FlowState::Rendering)?;
        let prompt = spec.template.render(&input)?;

        // Generate, running tool calls until the model answers
        run.advance(FlowState::Generating)?;
        let mut request = GenerationRequest {
            flow: spec.name.clone(),
            prompt,
            output_schema: spec.output.to_json_schema(),
            tools: spec
                .tools
                .iter()
                .filter_map(|t| self.tools.get(t))
                .map(|t| t.declaration())
                .collect(),
            transcript: Vec::new(),
            modality: spec.modality,
        };
        let raw = self.generation_loop(spec, &mut request, run).await?;

        // Validate output
        run.advance(FlowState::ValidatingOutput)?;
        let output = spec
            .output
            .validate(&raw)
            .map_err(FlowError::OutputValidation)?;
        run.advance(FlowState::Done)?;
        Ok(output)
    }

    async fn generation_loop(
        &self,
        spec: &FlowSpec,
        request: &mut GenerationRequest,
        run: &mut FlowRun,
    ) -> Result<Value, FlowError> {
        let timeout = Duration::from_secs(self.limits.generation_timeout_secs);
        let mut rounds: u32 = 0;

        loop {
            let turn = match tokio::time::timeout(timeout, self.backend.generate(request)).await {
                Ok(turn) => turn?,
                Err(_) => return Err(BackendError::Timeout(timeout).into()),
            };

            let calls = match turn {
                ModelTurn::Final(Value::Null) => return Err(BackendError::EmptyResponse.into()),
                ModelTurn::Final(value) => return Ok(value),
                ModelTurn::ToolCalls(calls) if calls.is_empty() => {
                    return Err(BackendError::EmptyResponse.into())
                }
                ModelTurn::ToolCalls(calls) => calls,
            };

            rounds += 1;
            if rounds > self.limits.max_tool_rounds {
                return Err(BackendError::TooManyToolRounds(self.limits.max_tool_rounds).into());
            }

            run.advance(FlowState::ToolCalling)?;
            for call in calls {
                if !spec.tools.contains(&call.name) {
                    let err = if self.tools.contains(&call.name) {
                        ToolError::NotPermitted {
                            tool: call.name.clone(),
                            flow: spec.name.clone(),
                        }
                    } else {
                        ToolError::UnknownTool(call.name.clone())
                    };
                    return Err(err.into());
                }

                debug!(tool = %call.name, rounds, "Calling tool");
                let output = self.tools.invoke(&call.name).await?;
                request.transcript.push(TranscriptEntry {
                    round: rounds,
                    call,
                    output,
                });
            }
            run.advance(FlowState::Generating)?;
        }
    }
}

impl fmt::Debug for FlowOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowOrchestrator")
            .field("flows", &self.names())
            .field("tools", &self.tools)
            .field("backend", &self.backend.name())
            .field("limits", &self.limits)
            .finish()
    }
}

/// Orchestrator over the demo dataset with a scripted backend, pinned to
/// 2026-10-18 so the revenue window is stable.
#[cfg(test)]
pub(crate) fn demo_orchestrator(
    backend: Arc<crate::backend::ScriptedBackend>,
    limits: FlowsConfig,
) -> FlowOrchestrator {
    use chrono::{TimeZone, Utc};
    use courtside_core::seed::demo_dataset;
    use courtside_core::store::{DataSource, InMemoryStore};

    let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
    let source: Arc<dyn DataSource> = Arc::new(InMemoryStore::new(demo_dataset(now)));
    let tools = Arc::new(ToolRegistry::with_defaults(source).with_clock(move || now));
    FlowOrchestrator::with_defaults(tools, backend, limits).unwrap()
}
