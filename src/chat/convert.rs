//! UI messages to model messages

use super::error::ConversationError;
use super::message::{UiMessage, UiPart, UiRole};
use crate::llm::{Message, ToolCall};
use crate::mcp::McpToolResult;
use serde_json::Value;

/// Output recorded for a tool call whose result never arrived
const MISSING_RESULT: &str = "Tool call did not complete";

/// Reject a sequence that does not open with a user message
pub fn require_leading_user(messages: &[UiMessage]) -> Result<(), ConversationError> {
    match messages.first() {
        None => Err(ConversationError::MissingUserMessage),
        Some(first) if first.role != UiRole::User => {
            Err(ConversationError::LeadingMessageNotUser(first.role))
        }
        Some(_) => Ok(()),
    }
}

/// Drop everything before the first user message
pub fn normalize_starts_with_user(
    messages: &[UiMessage],
) -> Result<&[UiMessage], ConversationError> {
    let start = messages
        .iter()
        .position(|m| m.role == UiRole::User)
        .ok_or(ConversationError::MissingUserMessage)?;
    Ok(&messages[start..])
}

/// Convert UI messages to provider messages
///
/// Tool calls and their results inside one assistant message become an
/// assistant tool-use turn followed by one tool message per call. Unknown
/// parts are dropped.
pub fn to_model_messages(messages: &[UiMessage]) -> Vec<Message> {
    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            UiRole::System => out.push(Message::system(message.text())),
            UiRole::User => out.push(Message::user(message.text())),
            UiRole::Assistant => convert_assistant(message, &mut out),
        }
    }
    out
}

#[derive(Default)]
struct PendingStep {
    text: String,
    calls: Vec<ToolCall>,
    results: Vec<(String, String)>,
}

impl PendingStep {
    fn flush(&mut self, out: &mut Vec<Message>) {
        let step = std::mem::take(self);
        if step.calls.is_empty() {
            if !step.text.is_empty() {
                out.push(Message::assistant(step.text));
            }
            return;
        }

        let text = Some(step.text).filter(|t| !t.is_empty());
        out.push(Message::assistant_with_tools(text, &step.calls));
        for call in &step.calls {
            let output = step
                .results
                .iter()
                .find(|(id, _)| *id == call.id)
                .map(|(_, output)| output.clone())
                .unwrap_or_else(|| MISSING_RESULT.to_string());
            out.push(Message::tool_result(call.id.clone(), output));
        }
    }
}

fn convert_assistant(message: &UiMessage, out: &mut Vec<Message>) {
    let mut step = PendingStep::default();
    for part in &message.parts {
        match part {
            UiPart::Text { text } => {
                // Text after tool results starts the next model step
                if !step.calls.is_empty() {
                    step.flush(out);
                }
                step.text.push_str(text);
            }
            UiPart::ToolCall {
                tool_call_id,
                tool_name,
                args,
            } => step.calls.push(ToolCall {
                id: tool_call_id.clone(),
                name: tool_name.clone(),
                arguments: args.clone(),
            }),
            UiPart::ToolResult {
                tool_call_id,
                output,
                ..
            } => {
                if step.calls.iter().any(|c| c.id == *tool_call_id) {
                    step.results
                        .push((tool_call_id.clone(), output_text(output)));
                } else {
                    tracing::debug!("Dropping tool result without a call: {}", tool_call_id);
                }
            }
            UiPart::Unknown(_) => {}
        }
    }
    step.flush(out);
}

/// Text handed back to the model for a tool output
fn output_text(output: &Value) -> String {
    match output {
        Value::String(s) => s.clone(),
        other => match serde_json::from_value::<McpToolResult>(other.clone()) {
            Ok(result) if !result.content.is_empty() => result.to_text(),
            _ => other.to_string(),
        },
    }
}
