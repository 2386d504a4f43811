//! Ordered transcript that folds streamed events into messages

use super::convert::normalize_starts_with_user;
use super::error::ConversationError;
use super::message::{new_message_id, MessageStatus, UiMessage, UiPart, UNKNOWN_TOOL};
use super::stream::UiStreamEvent;
use serde_json::Value;
use std::collections::HashMap;

/// Id of the local greeting shown before the first turn
pub const GREETING_ID: &str = "msg-1";

/// What changed after applying one stream item
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// An assistant message opened
    Started { message_id: String },
    /// Text appended to the in-flight message
    TextDelta { message_id: String, delta: String },
    /// A part other than streamed text was appended
    PartAdded { message_id: String, part: UiPart },
    /// The in-flight message finalized normally
    Finished { message_id: String },
    /// The turn failed; `message_id` names the message marked incomplete
    Failed {
        message_id: Option<String>,
        error: String,
    },
}

/// Messages of one chat session
///
/// Only the in-flight assistant message is ever mutated; everything before
/// it is final.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<UiMessage>,
    /// Index of the assistant message receiving events
    in_flight: Option<usize>,
    /// Open text parts of the in-flight message, by stream text id
    open_text: HashMap<String, usize>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a local assistant greeting
    pub fn with_greeting(text: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation
            .messages
            .push(UiMessage::assistant_text(GREETING_ID, text));
        conversation
    }

    pub fn messages(&self) -> &[UiMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&UiMessage> {
        self.messages.last()
    }

    pub fn get(&self, id: &str) -> Option<&UiMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn is_streaming(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> &UiMessage {
        let index = self.messages.len();
        self.messages.push(UiMessage::user(text));
        &self.messages[index]
    }

    /// History to send for the next turn, starting at the first user message
    pub fn outbound_messages(&self) -> Result<Vec<UiMessage>, ConversationError> {
        normalize_starts_with_user(&self.messages).map(<[UiMessage]>::to_vec)
    }

    /// Fold one stream event into the transcript
    ///
    /// Events are applied tolerantly: a missing `start` opens the assistant
    /// message implicitly, a delta for an unseen text id opens a new text
    /// part, and an output without its call is recorded under tool name
    /// `unknown`.
    pub fn apply(&mut self, event: UiStreamEvent) -> Option<SessionUpdate> {
        match event {
            UiStreamEvent::Start { message_id } => {
                if self.in_flight.is_some() {
                    return None;
                }
                let id = message_id.unwrap_or_else(new_message_id);
                self.open(id.clone());
                Some(SessionUpdate::Started { message_id: id })
            }
            UiStreamEvent::StartStep | UiStreamEvent::FinishStep => {
                self.ensure_open();
                None
            }
            UiStreamEvent::TextStart { id } => {
                let index = self.ensure_open();
                let message = &mut self.messages[index];
                message.parts.push(UiPart::text(""));
                self.open_text.insert(id, message.parts.len() - 1);
                None
            }
            UiStreamEvent::TextDelta { id, delta } => {
                let index = self.ensure_open();
                let message = &mut self.messages[index];
                match self.open_text.get(&id).copied() {
                    Some(part) => {
                        if let Some(UiPart::Text { text }) = message.parts.get_mut(part) {
                            text.push_str(&delta);
                        }
                    }
                    None => {
                        message.parts.push(UiPart::text(delta.clone()));
                        self.open_text.insert(id, message.parts.len() - 1);
                    }
                }
                Some(SessionUpdate::TextDelta {
                    message_id: message.id.clone(),
                    delta,
                })
            }
            UiStreamEvent::TextEnd { id } => {
                self.open_text.remove(&id);
                None
            }
            UiStreamEvent::ToolInputAvailable {
                tool_call_id,
                tool_name,
                input,
            } => Some(self.push_part(UiPart::ToolCall {
                tool_call_id,
                tool_name,
                args: input,
            })),
            UiStreamEvent::ToolOutputAvailable {
                tool_call_id,
                output,
            } => Some(self.push_tool_result(tool_call_id, output, false)),
            UiStreamEvent::ToolOutputError {
                tool_call_id,
                error_text,
            } => Some(self.push_tool_result(tool_call_id, Value::String(error_text), true)),
            UiStreamEvent::Error { error_text } => Some(self.fail(error_text)),
            UiStreamEvent::Finish => Some(self.finish()),
        }
    }

    /// Mark the in-flight message incomplete and end the turn
    pub fn fail(&mut self, error: impl Into<String>) -> SessionUpdate {
        let error = error.into();
        let message_id = self.close(MessageStatus::Incomplete, Some(error.clone()));
        SessionUpdate::Failed { message_id, error }
    }

    /// Stop the turn locally; `None` when nothing was streaming
    pub fn cancel(&mut self) -> Option<SessionUpdate> {
        self.in_flight?;
        Some(self.fail("Cancelled"))
    }

    /// A reply with no parts still completes as an empty assistant message
    fn finish(&mut self) -> SessionUpdate {
        self.ensure_open();
        let message_id = self
            .close(MessageStatus::Complete, None)
            .unwrap_or_else(new_message_id);
        SessionUpdate::Finished { message_id }
    }

    fn open(&mut self, id: String) -> usize {
        self.messages.push(UiMessage::streaming_assistant(id));
        self.open_text.clear();
        let index = self.messages.len() - 1;
        self.in_flight = Some(index);
        index
    }

    fn ensure_open(&mut self) -> usize {
        match self.in_flight {
            Some(index) => index,
            None => self.open(new_message_id()),
        }
    }

    fn close(&mut self, status: MessageStatus, error: Option<String>) -> Option<String> {
        let index = self.in_flight.take()?;
        self.open_text.clear();
        let message = &mut self.messages[index];
        message.status = status;
        message.error = error;
        Some(message.id.clone())
    }

    fn push_part(&mut self, part: UiPart) -> SessionUpdate {
        let index = self.ensure_open();
        let message = &mut self.messages[index];
        message.parts.push(part.clone());
        SessionUpdate::PartAdded {
            message_id: message.id.clone(),
            part,
        }
    }

    fn push_tool_result(
        &mut self,
        tool_call_id: String,
        output: Value,
        is_error: bool,
    ) -> SessionUpdate {
        let index = self.ensure_open();
        let tool_name = self.messages[index]
            .parts
            .iter()
            .find_map(|p| match p {
                UiPart::ToolCall {
                    tool_call_id: id,
                    tool_name,
                    ..
                } if *id == tool_call_id => Some(tool_name.clone()),
                _ => None,
            })
            .unwrap_or_else(|| UNKNOWN_TOOL.to_string());

        self.push_part(UiPart::ToolResult {
            tool_call_id,
            tool_name,
            output,
            is_error,
        })
    }
}
