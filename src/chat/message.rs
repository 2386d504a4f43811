//! UI messages and their typed parts

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Tool name recorded when an output arrives without its call
pub const UNKNOWN_TOOL: &str = "unknown";

/// Author of a UI message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UiRole {
    User,
    Assistant,
    System,
}

impl UiRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UiRole::User => "user",
            UiRole::Assistant => "assistant",
            UiRole::System => "system",
        }
    }
}

impl std::fmt::Display for UiRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local lifecycle of a message; never sent over the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageStatus {
    /// Still receiving parts
    Streaming,
    /// Finalized normally
    #[default]
    Complete,
    /// The stream failed or was cancelled before finishing
    Incomplete,
}

/// A message in the chat transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiMessage {
    pub id: String,
    pub role: UiRole,
    #[serde(default)]
    pub parts: Vec<UiPart>,
    #[serde(skip)]
    pub status: MessageStatus,
    #[serde(skip)]
    pub error: Option<String>,
}

impl UiMessage {
    pub fn new(id: impl Into<String>, role: UiRole, parts: Vec<UiPart>) -> Self {
        Self {
            id: id.into(),
            role,
            parts,
            status: MessageStatus::Complete,
            error: None,
        }
    }

    /// A finalized user message with a fresh id
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(new_message_id(), UiRole::User, vec![UiPart::text(text)])
    }

    /// A finalized assistant message holding one text part
    pub fn assistant_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, UiRole::Assistant, vec![UiPart::text(text)])
    }

    /// An empty assistant message that is about to receive streamed parts
    pub fn streaming_assistant(id: impl Into<String>) -> Self {
        Self {
            status: MessageStatus::Streaming,
            ..Self::new(id, UiRole::Assistant, Vec::new())
        }
    }

    /// Concatenated text parts
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                UiPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn is_streaming(&self) -> bool {
        self.status == MessageStatus::Streaming
    }

    /// Whether this message can no longer change
    pub fn is_final(&self) -> bool {
        !self.is_streaming()
    }

    pub fn is_from(&self, role: UiRole) -> bool {
        self.role == role
    }
}

pub fn new_message_id() -> String {
    format!("msg-{}", uuid::Uuid::new_v4().simple())
}

/// One ordered piece of a message
///
/// Tags this model does not know are kept as [`UiPart::Unknown`] and written
/// back unchanged, as are known tags whose fields do not match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum UiPart {
    Text {
        text: String,
    },
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        args: Value,
    },
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        output: Value,
        is_error: bool,
    },
    Unknown(Value),
}

impl UiPart {
    pub fn text(text: impl Into<String>) -> Self {
        UiPart::Text { text: text.into() }
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            UiPart::ToolCall { tool_call_id, .. } | UiPart::ToolResult { tool_call_id, .. } => {
                Some(tool_call_id)
            }
            _ => None,
        }
    }
}

/// Wire shape of the parts this model understands
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum KnownPart {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        args: Value,
    },
    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_call_id: String,
        #[serde(default = "unknown_tool")]
        tool_name: String,
        #[serde(default, alias = "result")]
        output: Value,
        #[serde(default)]
        is_error: bool,
    },
}

fn unknown_tool() -> String {
    UNKNOWN_TOOL.to_string()
}

impl From<Value> for UiPart {
    fn from(value: Value) -> Self {
        match KnownPart::deserialize(&value) {
            Ok(KnownPart::Text { text }) => UiPart::Text { text },
            Ok(KnownPart::ToolCall {
                tool_call_id,
                tool_name,
                args,
            }) => UiPart::ToolCall {
                tool_call_id,
                tool_name,
                args,
            },
            Ok(KnownPart::ToolResult {
                tool_call_id,
                tool_name,
                output,
                is_error,
            }) => UiPart::ToolResult {
                tool_call_id,
                tool_name,
                output,
                is_error,
            },
            Err(_) => UiPart::Unknown(value),
        }
    }
}

impl From<UiPart> for Value {
    fn from(part: UiPart) -> Self {
        match part {
            UiPart::Text { text } => json!({ "type": "text", "text": text }),
            UiPart::ToolCall {
                tool_call_id,
                tool_name,
                args,
            } => json!({
                "type": "tool-call",
                "toolCallId": tool_call_id,
                "toolName": tool_name,
                "args": args,
            }),
            UiPart::ToolResult {
                tool_call_id,
                tool_name,
                output,
                is_error,
            } => json!({
                "type": "tool-result",
                "toolCallId": tool_call_id,
                "toolName": tool_name,
                "output": output,
                "isError": is_error,
            }),
            UiPart::Unknown(value) => value,
        }
    }
}
