//! UI message-stream events
//!
//! The chat endpoint answers with SSE frames whose `data:` payload is one
//! JSON event tagged by `type`, terminated by `data: [DONE]`.

use crate::sse::{encode_data, SseDecoder, DONE_MARKER};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response header advertising the stream format
pub const STREAM_HEADER: &str = "x-vercel-ai-ui-message-stream";
pub const STREAM_VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiStreamEvent {
    #[serde(rename_all = "camelCase")]
    Start {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    StartStep,
    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolInputAvailable {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(rename_all = "camelCase")]
    ToolOutputAvailable {
        tool_call_id: String,
        #[serde(default)]
        output: Value,
    },
    #[serde(rename_all = "camelCase")]
    ToolOutputError {
        tool_call_id: String,
        error_text: String,
    },
    FinishStep,
    #[serde(rename_all = "camelCase")]
    Error {
        error_text: String,
    },
    Finish,
}

impl UiStreamEvent {
    /// Frame the event as one SSE event
    pub fn encode(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!("Failed to encode stream event: {}", e);
            r#"{"type":"error","errorText":"Failed to encode stream event"}"#.to_string()
        });
        encode_data(&json)
    }
}

/// The terminating frame
pub fn encode_done() -> String {
    encode_data(DONE_MARKER)
}

/// One decoded frame of the stream
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Event(UiStreamEvent),
    Done,
}

/// Interpret one `data:` payload; unknown event types are skipped
pub fn parse_frame(payload: &str) -> Option<Frame> {
    let payload = payload.trim();
    if payload.is_empty() {
        return None;
    }
    if payload == DONE_MARKER {
        return Some(Frame::Done);
    }
    match serde_json::from_str::<UiStreamEvent>(payload) {
        Ok(event) => Some(Frame::Event(event)),
        Err(e) => {
            tracing::debug!("Skipping stream payload {}: {}", payload, e);
            None
        }
    }
}

/// Incremental decoder from response bytes to frames
#[derive(Debug, Default)]
pub struct UiEventDecoder {
    sse: SseDecoder,
}

impl UiEventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.sse
            .push(bytes)
            .iter()
            .filter_map(|p| parse_frame(p))
            .collect()
    }

    pub fn finish(&mut self) -> Vec<Frame> {
        self.sse
            .finish()
            .iter()
            .filter_map(|p| parse_frame(p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let event = UiStreamEvent::ToolInputAvailable {
            tool_call_id: "c1".into(),
            tool_name: "get_collections".into(),
            input: json!({"keyword": "ice"}),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "tool-input-available",
                "toolCallId": "c1",
                "toolName": "get_collections",
                "input": {"keyword": "ice"}
            })
        );
        assert_eq!(
            serde_json::to_value(UiStreamEvent::StartStep).unwrap(),
            json!({"type": "start-step"})
        );
        assert_eq!(
            serde_json::to_value(UiStreamEvent::Start {
                message_id: Some("m1".into())
            })
            .unwrap(),
            json!({"type": "start", "messageId": "m1"})
        );
    }

    #[test]
    fn test_decoder_splits_and_skips() {
        let mut body = String::new();
        body.push_str(
            &UiStreamEvent::TextDelta {
                id: "t".into(),
                delta: "multi\nline".into(),
            }
            .encode(),
        );
        body.push_str("data: {\"type\":\"reasoning-delta\",\"delta\":\"x\"}\n\n");
        body.push_str(&UiStreamEvent::Finish.encode());
        body.push_str(&encode_done());

        let bytes = body.as_bytes();
        let mut decoder = UiEventDecoder::new();
        let mut frames = Vec::new();
        for chunk in bytes.chunks(7) {
            frames.extend(decoder.push(chunk));
        }
        frames.extend(decoder.finish());

        assert_eq!(
            frames,
            vec![
                Frame::Event(UiStreamEvent::TextDelta {
                    id: "t".into(),
                    delta: "multi\nline".into(),
                }),
                Frame::Event(UiStreamEvent::Finish),
                Frame::Done,
            ]
        );
    }
}
