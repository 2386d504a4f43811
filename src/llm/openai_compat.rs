//! Generic OpenAI-compatible LLM provider
//!
//! Works with any endpoint that speaks the OpenAI chat completions format
//! with `stream: true` (OpenAI, OpenRouter, Ollama, vLLM, llama.cpp, ...).
//!
//! SECURITY: Credentials are only sent to the configured endpoint.

use super::{
    LlmError, LlmProvider, LlmResponse, Message, MessageContent, Role, StreamCallback,
    StreamEvent, StreamingResponseBuilder, TokenUsage, ToolDefinition,
};
use crate::llm::ContentPart;
use crate::sse::SseDecoder;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Configuration Types
// ============================================================================

/// Authentication method for the API
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Bearer token in Authorization header
    BearerToken(String),
    /// No credentials (local servers)
    None,
}

/// Configuration for an OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    /// Provider name used in logs and errors
    pub name: String,
    /// Full chat completions URL
    pub base_url: String,
    pub auth: AuthMethod,
    pub model: String,
    pub max_tokens: usize,
}

impl OpenAiCompatConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, auth: AuthMethod) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            auth,
            model: String::new(),
            max_tokens: 4096,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    config: OpenAiCompatConfig,
}

impl OpenAiCompatProvider {
    pub fn new(config: OpenAiCompatConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    // ========================================================================
    // Message Conversion
    // ========================================================================

    /// Convert internal messages to OpenAI format
    fn convert_messages(&self, messages: &[Message]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                };

                match &msg.content {
                    MessageContent::Text(text) => OpenAiMessage {
                        role: role.to_string(),
                        content: Some(text.clone()),
                        tool_calls: None,
                        tool_call_id: msg.tool_call_id.clone(),
                    },
                    MessageContent::Parts(parts) => {
                        let tool_calls: Vec<OpenAiToolCall> = parts
                            .iter()
                            .filter_map(|p| match p {
                                ContentPart::ToolUse { id, name, input } => Some(OpenAiToolCall {
                                    id: id.clone(),
                                    call_type: "function".to_string(),
                                    function: OpenAiFunctionCall {
                                        name: name.clone(),
                                        arguments: input.to_string(),
                                    },
                                }),
                                ContentPart::Text { .. } => None,
                            })
                            .collect();

                        let text = msg.content.text();
                        OpenAiMessage {
                            role: role.to_string(),
                            content: if text.is_empty() { None } else { Some(text) },
                            tool_calls: if tool_calls.is_empty() {
                                None
                            } else {
                                Some(tool_calls)
                            },
                            tool_call_id: msg.tool_call_id.clone(),
                        }
                    }
                }
            })
            .collect()
    }

    /// Convert internal tool definitions to OpenAI format
    fn convert_tools(&self, tools: &[ToolDefinition]) -> Vec<OpenAiTool> {
        tools
            .iter()
            .map(|t| OpenAiTool {
                tool_type: "function".to_string(),
                function: OpenAiFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn build_request(&self, messages: &[Message], tools: Option<&[ToolDefinition]>) -> OpenAiRequest {
        let tools = tools.filter(|t| !t.is_empty()).map(|t| self.convert_tools(t));
        OpenAiRequest {
            model: self.config.model.clone(),
            messages: self.convert_messages(messages),
            max_tokens: Some(self.config.max_tokens),
            tool_choice: tools.as_ref().map(|_| "auto".to_string()),
            tools,
            stream: true,
            stream_options: Some(StreamOptions {
                include_usage: true,
            }),
        }
    }

    fn build_http_request(&self, body: &OpenAiRequest) -> reqwest::RequestBuilder {
        let req = self
            .client
            .post(&self.config.base_url)
            .header("Content-Type", "application/json");

        let req = match &self.config.auth {
            AuthMethod::BearerToken(token) => {
                req.header("Authorization", format!("Bearer {}", token))
            }
            AuthMethod::None => req,
        };

        req.json(body)
    }
}

/// Per-index tool call assembly while streaming
#[derive(Default)]
struct StreamState {
    builder: StreamingResponseBuilder,
    /// choice index -> call id
    calls_by_index: BTreeMap<usize, String>,
    done: bool,
}

impl StreamState {
    fn apply(&mut self, payload: &str, callback: &StreamCallback) {
        if payload.trim() == crate::sse::DONE_MARKER {
            self.done = true;
            return;
        }

        let chunk = match serde_json::from_str::<OpenAiStreamChunk>(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!("Skipping unparseable stream chunk: {}", e);
                return;
            }
        };

        if let Some(choice) = chunk.choices.first() {
            if let Some(content) = choice.delta.content.as_deref().filter(|c| !c.is_empty()) {
                let event = StreamEvent::TextDelta(content.to_string());
                self.builder.process(&event);
                callback(event);
            }

            for tc in choice.delta.tool_calls.iter().flatten() {
                if let Some(id) = &tc.id {
                    let name = tc
                        .function
                        .as_ref()
                        .and_then(|f| f.name.clone())
                        .unwrap_or_default();
                    self.calls_by_index.insert(tc.index, id.clone());
                    let event = StreamEvent::ToolCallStart {
                        id: id.clone(),
                        name,
                    };
                    self.builder.process(&event);
                    callback(event);
                }

                let args = tc
                    .function
                    .as_ref()
                    .and_then(|f| f.arguments.as_deref())
                    .filter(|a| !a.is_empty());
                if let (Some(args), Some(id)) = (args, self.calls_by_index.get(&tc.index)) {
                    let event = StreamEvent::ToolCallDelta {
                        id: id.clone(),
                        arguments_delta: args.to_string(),
                    };
                    self.builder.process(&event);
                    callback(event);
                }
            }

            if choice.finish_reason.is_some() {
                for id in self.calls_by_index.values() {
                    callback(StreamEvent::ToolCallComplete { id: id.clone() });
                }
            }
        }

        if let Some(usage) = chunk.usage {
            self.builder.usage = Some(TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            });
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn chat_streaming(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        callback: StreamCallback,
    ) -> Result<LlmResponse> {
        use futures::StreamExt;
        use tokio::time::{timeout, Duration};

        const STREAM_CHUNK_TIMEOUT: Duration = Duration::from_secs(60);

        tracing::debug!(
            target: "llm",
            provider = self.config.name,
            model = self.config.model,
            messages = messages.len(),
            "Sending streaming request"
        );

        let request = self.build_request(messages, tools);
        let response = self
            .build_http_request(&request)
            .send()
            .await
            .map_err(LlmError::from_network_error)
            .with_context(|| format!("Failed to send request to {} API", self.config.name))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            callback(StreamEvent::Error(format!(
                "{} API error ({}): {}",
                self.config.name, status, error_text
            )));
            return Err(LlmError::from_http_status(status, error_text).into());
        }

        let mut state = StreamState::default();
        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        loop {
            let chunk = match timeout(STREAM_CHUNK_TIMEOUT, stream.next()).await {
                Ok(Some(chunk)) => chunk.map_err(LlmError::from_network_error)?,
                Ok(None) => break,
                Err(_) => {
                    return Err(LlmError::Network(format!(
                        "Stream timeout - no response from {} for {} seconds",
                        self.config.name,
                        STREAM_CHUNK_TIMEOUT.as_secs()
                    ))
                    .into())
                }
            };

            for payload in decoder.push(&chunk) {
                state.apply(&payload, &callback);
            }
            if state.done {
                break;
            }
        }

        for payload in decoder.finish() {
            state.apply(&payload, &callback);
        }

        callback(StreamEvent::Done);
        Ok(state.builder.build())
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCallDelta {
    index: usize,
    id: Option<String>,
    function: Option<OpenAiFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}
