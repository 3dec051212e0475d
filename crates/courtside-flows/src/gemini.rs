//! Gemini `generateContent` backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use courtside_core::config::BackendConfig;

use crate::backend::{
    GenerationRequest, GenerativeBackend, Modality, ModelTurn, ToolCall, IMAGE_DATA_URI_FIELD,
};
use crate::error::BackendError;

/// JSON Schema keywords the Gemini response schema does not accept.
const UNSUPPORTED_SCHEMA_KEYS: [&str; 5] = [
    "additionalProperties",
    "minLength",
    "maxLength",
    "pattern",
    "minimum",
];

pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    image_model: String,
}

impl GeminiBackend {
    pub fn new(config: &BackendConfig, api_key: String) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    /// Build from config, reading the API key from the configured variable.
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let api_key = config.api_key().ok_or(BackendError::NotConfigured)?;
        Self::new(config, api_key)
    }

    fn model_for(&self, modality: Modality) -> &str {
        match modality {
            Modality::Text => &self.model,
            Modality::Image => &self.image_model,
        }
    }

    fn endpoint(&self, modality: Modality) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url,
            self.model_for(modality)
        )
    }
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("image_model", &self.image_model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ModelTurn, BackendError> {
        let body = build_request_body(request);
        debug!(
            flow = %request.flow,
            model = self.model_for(request.modality),
            transcript = request.transcript.len(),
            "Calling Gemini"
        );

        let response = self
            .client
            .post(self.endpoint(request.modality))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = handle_api_error(response).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;
        parse_response(body)
    }
}

/// Map non-success statuses to `BackendError::Api`, pulling the message out
/// of Gemini's `{"error": {"message": ...}}` envelope when present.
async fn handle_api_error(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);

    Err(BackendError::Api {
        status: status.as_u16(),
        message,
    })
}

// =============================================================================
// Request building
// =============================================================================

/// Build the `generateContent` body for a request.
pub fn build_request_body(request: &GenerationRequest) -> Value {
    let mut prompt = request.prompt.clone();
    let mut generation_config = Map::new();

    match request.modality {
        Modality::Image => {
            generation_config.insert("responseModalities".into(), json!(["TEXT", "IMAGE"]));
        }
        Modality::Text if request.tools.is_empty() => {
            generation_config.insert("responseMimeType".into(), json!("application/json"));
            generation_config.insert(
                "responseSchema".into(),
                sanitize_schema(&request.output_schema),
            );
        }
        Modality::Text => {
            // Gemini rejects function calling combined with a response schema.
            prompt.push_str(
                "\n\nWhen you have gathered everything you need, respond only with a JSON \
                 object matching this JSON Schema:\n",
            );
            prompt.push_str(&request.output_schema.to_string());
        }
    }

    let mut contents = vec![json!({ "role": "user", "parts": [{ "text": prompt }] })];
    for round in request.transcript.chunk_by(|a, b| a.round == b.round) {
        let calls: Vec<Value> = round
            .iter()
            .map(|e| {
                json!({ "functionCall": { "name": e.call.name, "args": e.call.arguments } })
            })
            .collect();
        let results: Vec<Value> = round
            .iter()
            .map(|e| {
                json!({
                    "functionResponse": {
                        "name": e.call.name,
                        "response": { "result": e.output }
                    }
                })
            })
            .collect();
        contents.push(json!({ "role": "model", "parts": calls }));
        contents.push(json!({ "role": "user", "parts": results }));
    }

    let mut body = json!({ "contents": contents });
    if !generation_config.is_empty() {
        body["generationConfig"] = Value::Object(generation_config);
    }
    if !request.tools.is_empty() {
        let declarations: Vec<Value> = request
            .tools
            .iter()
            .map(|t| {
                let mut decl = json!({ "name": t.name, "description": t.description });
                let has_params = t.parameters["properties"]
                    .as_object()
                    .is_some_and(|p| !p.is_empty());
                if has_params {
                    decl["parameters"] = sanitize_schema(&t.parameters);
                }
                decl
            })
            .collect();
        body["tools"] = json!([{ "functionDeclarations": declarations }]);
    }
    body
}

/// Strip the JSON Schema keywords Gemini rejects, recursively.
pub fn sanitize_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| !UNSUPPORTED_SCHEMA_KEYS.contains(&k.as_str()))
                .map(|(k, v)| {
                    // Property names are data, not keywords.
                    if k == "properties" {
                        let props = v
                            .as_object()
                            .map(|p| {
                                p.iter()
                                    .map(|(name, s)| (name.clone(), sanitize_schema(s)))
                                    .collect::<Map<String, Value>>()
                            })
                            .unwrap_or_default();
                        (k.clone(), Value::Object(props))
                    } else {
                        (k.clone(), sanitize_schema(v))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_schema).collect()),
        other => other.clone(),
    }
}

// =============================================================================
// Response parsing
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCall>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Turn a `generateContent` response body into a model turn.
///
/// Function calls win over text. An inline image becomes
/// `{"imageDataUri": "data:<mime>;base64,<data>"}`. Text is parsed as JSON,
/// tolerating a surrounding Markdown code fence; text that is not JSON comes
/// back as a string value.
pub fn parse_response(body: Value) -> Result<ModelTurn, BackendError> {
    let response: GenerateResponse = serde_json::from_value(body)
        .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(BackendError::MalformedResponse(format!(
                "prompt blocked: {}",
                reason
            )));
        }
        return Err(BackendError::EmptyResponse);
    };

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    if parts.is_empty() {
        return match candidate.finish_reason {
            Some(reason) if reason != "STOP" => Err(BackendError::MalformedResponse(format!(
                "generation stopped: {}",
                reason
            ))),
            _ => Err(BackendError::EmptyResponse),
        };
    }

    let mut calls = Vec::new();
    let mut image = None;
    let mut text = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if let Some(call) = part.function_call {
            calls.push(ToolCall {
                id: call.id.unwrap_or_else(|| format!("{}-{}", call.name, i)),
                name: call.name,
                arguments: if call.args.is_null() { json!({}) } else { call.args },
            });
        } else if let Some(data) = part.inline_data {
            image.get_or_insert(data);
        } else if let Some(t) = part.text {
            text.push_str(&t);
        }
    }

    if !calls.is_empty() {
        return Ok(ModelTurn::ToolCalls(calls));
    }
    if let Some(data) = image {
        let mut output = Map::new();
        output.insert(
            IMAGE_DATA_URI_FIELD.to_string(),
            Value::String(format!("data:{};base64,{}", data.mime_type, data.data)),
        );
        return Ok(ModelTurn::Final(Value::Object(output)));
    }

    let text = strip_code_fence(&text);
    if text.is_empty() {
        return Err(BackendError::EmptyResponse);
    }
    let output = serde_json::from_str(text).unwrap_or_else(|e| {
        debug!(error = %e, "Model text is not JSON");
        Value::String(text.to_string())
    });
    Ok(ModelTurn::Final(output))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
