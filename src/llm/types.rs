//! Shared types for LLM providers

use serde::{Deserialize, Serialize};

/// Role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Content of a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// All text in the message, parts joined with newlines
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Part of a multi-part message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(content.into()),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(content.into()),
            tool_call_id: None,
        }
    }

    /// Assistant turn that requested tools
    pub fn assistant_with_tools(text: Option<String>, calls: &[ToolCall]) -> Self {
        let mut parts = Vec::with_capacity(calls.len() + 1);
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            parts.push(ContentPart::Text { text });
        }
        parts.extend(calls.iter().map(|c| ContentPart::ToolUse {
            id: c.id.clone(),
            name: c.name.clone(),
            input: c.arguments.clone(),
        }));
        Self {
            role: Role::Assistant,
            content: MessageContent::Parts(parts),
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: MessageContent::Text(content.into()),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// A tool call from the LLM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Definition of a tool for the LLM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Token usage statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// Response from an LLM
#[derive(Debug, Clone)]
pub enum LlmResponse {
    /// Plain text response
    Text {
        text: String,
        usage: Option<TokenUsage>,
    },
    /// Tool calls requested by the model
    ToolCalls {
        calls: Vec<ToolCall>,
        usage: Option<TokenUsage>,
    },
    /// Mixed response with text and tool calls
    Mixed {
        text: Option<String>,
        tool_calls: Vec<ToolCall>,
        usage: Option<TokenUsage>,
    },
}

impl LlmResponse {
    pub fn text(&self) -> Option<&str> {
        match self {
            LlmResponse::Text { text, .. } => Some(text),
            LlmResponse::Mixed { text, .. } => text.as_deref(),
            LlmResponse::ToolCalls { .. } => None,
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            LlmResponse::ToolCalls { calls, .. } => calls,
            LlmResponse::Mixed { tool_calls, .. } => tool_calls,
            LlmResponse::Text { .. } => &[],
        }
    }

    pub fn usage(&self) -> Option<&TokenUsage> {
        match self {
            LlmResponse::Text { usage, .. } => usage.as_ref(),
            LlmResponse::ToolCalls { usage, .. } => usage.as_ref(),
            LlmResponse::Mixed { usage, .. } => usage.as_ref(),
        }
    }
}

// ============================================================================
// Streaming Types
// ============================================================================

/// Events emitted during streaming responses
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Regular text chunk from the assistant
    TextDelta(String),
    /// Tool call started
    ToolCallStart { id: String, name: String },
    /// Tool call arguments chunk (arguments come incrementally)
    ToolCallDelta { id: String, arguments_delta: String },
    /// Tool call completed (all arguments received)
    ToolCallComplete { id: String },
    /// Stream completed successfully
    Done,
    /// Error during streaming
    Error(String),
}

/// Callback type for streaming events
///
/// Called for each chunk as it arrives from the LLM. Implementations
/// should be fast and non-blocking.
pub type StreamCallback = Box<dyn Fn(StreamEvent) + Send + Sync>;

/// Builder for accumulating a streaming response
///
/// Tool calls keep the order in which the model started them.
#[derive(Debug, Default)]
pub struct StreamingResponseBuilder {
    pub text: String,
    /// (id, name, accumulated_args) in start order
    pub tool_calls: Vec<(String, String, String)>,
    pub usage: Option<TokenUsage>,
}

impl StreamingResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a stream event and accumulate content
    pub fn process(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::TextDelta(text) => {
                self.text.push_str(text);
            }
            StreamEvent::ToolCallStart { id, name } => {
                if !self.tool_calls.iter().any(|(existing, _, _)| existing == id) {
                    self.tool_calls
                        .push((id.clone(), name.clone(), String::new()));
                }
            }
            StreamEvent::ToolCallDelta {
                id,
                arguments_delta,
            } => {
                if let Some((_, _, args)) = self.tool_calls.iter_mut().find(|(i, _, _)| i == id) {
                    args.push_str(arguments_delta);
                }
            }
            StreamEvent::ToolCallComplete { .. } | StreamEvent::Done | StreamEvent::Error(_) => {}
        }
    }

    /// Build the final LlmResponse
    ///
    /// Empty argument strings become `{}`; unparseable ones become `null`.
    pub fn build(self) -> LlmResponse {
        let tool_calls: Vec<ToolCall> = self
            .tool_calls
            .into_iter()
            .map(|(id, name, args)| {
                let arguments = if args.trim().is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(&args).unwrap_or(serde_json::Value::Null)
                };
                ToolCall {
                    id,
                    name,
                    arguments,
                }
            })
            .collect();

        if tool_calls.is_empty() {
            LlmResponse::Text {
                text: self.text,
                usage: self.usage,
            }
        } else if self.text.is_empty() {
            LlmResponse::ToolCalls {
                calls: tool_calls,
                usage: self.usage,
            }
        } else {
            LlmResponse::Mixed {
                text: Some(self.text),
                tool_calls,
                usage: self.usage,
            }
        }
    }
}
