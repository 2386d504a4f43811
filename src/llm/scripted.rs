//! Deterministic offline provider
//!
//! Stands in for a hosted model in demos and tests: a user message becomes a
//! `get_collections` call, a tool result becomes a short summary. Text is
//! streamed word by word so the UI exercises incremental rendering.

use super::{
    LlmProvider, LlmResponse, Message, Role, StreamCallback, StreamEvent,
    StreamingResponseBuilder, ToolDefinition,
};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

const SEARCH_TOOL: &str = "get_collections";

/// Phrases after which the remainder of a request is taken as the keyword
const KEYWORD_MARKERS: [&str; 4] = [" related to ", " about ", " on ", " for "];

pub struct ScriptedProvider {
    next_call: AtomicU64,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            next_call: AtomicU64::new(1),
        }
    }

    fn call_id(&self) -> String {
        format!("call_{}", self.next_call.fetch_add(1, Ordering::Relaxed))
    }
}

/// Pull a search keyword out of a natural-language request
pub fn extract_keyword(request: &str) -> String {
    let lowered = request.to_lowercase();
    let start = KEYWORD_MARKERS
        .iter()
        .filter_map(|marker| lowered.find(marker).map(|idx| idx + marker.len()))
        .min()
        .unwrap_or(0);

    // Lowercasing can shift byte offsets for non-ASCII text; fall back to the whole request
    request
        .get(start..)
        .unwrap_or(request)
        .trim()
        .trim_end_matches(['?', '.', '!'])
        .trim()
        .to_string()
}

/// Summarize a `get_collections` result for the user
pub fn summarize_tool_output(output: &str) -> String {
    match serde_json::from_str::<Value>(output) {
        Ok(Value::Array(items)) if items.is_empty() => {
            "I couldn't find any collections matching that search.".to_string()
        }
        Ok(Value::Array(items)) => {
            let mut text = format!("I found {} collections:\n", items.len());
            for item in &items {
                let title = item.get("title").and_then(Value::as_str).unwrap_or("Untitled");
                let id = item
                    .get("concept_id")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                text.push_str(&format!("- {} ({})\n", title, id));
            }
            text
        }
        _ => format!("The search did not succeed: {}", output),
    }
}

fn stream_text(text: &str, callback: &StreamCallback, builder: &mut StreamingResponseBuilder) {
    for chunk in text.split_inclusive(' ') {
        let event = StreamEvent::TextDelta(chunk.to_string());
        builder.process(&event);
        callback(event);
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat_streaming(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        callback: StreamCallback,
    ) -> Result<LlmResponse> {
        let mut builder = StreamingResponseBuilder::new();
        let has_search = tools
            .map(|t| t.iter().any(|d| d.name == SEARCH_TOOL))
            .unwrap_or(false);

        match messages.last() {
            Some(last) if last.role == Role::Tool => {
                stream_text(&summarize_tool_output(&last.content.text()), &callback, &mut builder);
            }
            Some(last) if last.role == Role::User && has_search => {
                let id = self.call_id();
                let args = json!({ "keyword": extract_keyword(&last.content.text()) });
                for event in [
                    StreamEvent::ToolCallStart {
                        id: id.clone(),
                        name: SEARCH_TOOL.to_string(),
                    },
                    StreamEvent::ToolCallDelta {
                        id: id.clone(),
                        arguments_delta: args.to_string(),
                    },
                    StreamEvent::ToolCallComplete { id },
                ] {
                    builder.process(&event);
                    callback(event);
                }
            }
            Some(last) => {
                let reply = format!("You said: {}", last.content.text());
                stream_text(&reply, &callback, &mut builder);
            }
            None => stream_text("Hello! How can I help you today?", &callback, &mut builder),
        }

        callback(StreamEvent::Done);
        Ok(builder.build())
    }
}
