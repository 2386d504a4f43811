//! Chat agent with tool execution loop
//!
//! Drives up to `max_steps` model calls for one request and reports
//! progress as UI message-stream events on an unbounded channel.

use super::stream::UiStreamEvent;
use crate::llm::{LlmProvider, Message, StreamCallback, StreamEvent, ToolDefinition};
use crate::mcp::{McpClient, McpToolResult, ToolRegistry};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

pub const DEFAULT_MAX_STEPS: usize = 5;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant for exploring NASA Earth \
science data. Use the get_collections tool to search NASA's Common Metadata Repository, then \
summarize the collections you find with their titles and concept ids.";

/// Where the agent's tool calls go
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Tools offered to the model
    async fn definitions(&self) -> Result<Vec<ToolDefinition>>;

    /// Run one tool call; tool failures come back as `isError` results
    async fn execute(&self, name: &str, arguments: Value) -> Result<McpToolResult>;
}

#[async_trait]
impl ToolExecutor for McpClient {
    async fn definitions(&self) -> Result<Vec<ToolDefinition>> {
        Ok(self
            .list_tools()
            .await?
            .iter()
            .map(|t| t.to_definition())
            .collect())
    }

    async fn execute(&self, name: &str, arguments: Value) -> Result<McpToolResult> {
        self.call_tool(name, arguments).await
    }
}

/// In-process execution against a local registry
#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn definitions(&self) -> Result<Vec<ToolDefinition>> {
        Ok(ToolRegistry::definitions(self)
            .iter()
            .map(|t| t.to_definition())
            .collect())
    }

    async fn execute(&self, name: &str, arguments: Value) -> Result<McpToolResult> {
        match self.call(name, arguments).await {
            Some(result) => Ok(result?),
            None => anyhow::bail!("Unknown tool: {}", name),
        }
    }
}

/// Stream receiver went away; the client disconnected
#[derive(Debug, thiserror::Error)]
#[error("Client disconnected")]
pub struct Disconnected;

pub struct ChatAgent {
    llm: Arc<dyn LlmProvider>,
    tools: Arc<dyn ToolExecutor>,
    max_steps: usize,
    system_prompt: Option<String>,
}

impl ChatAgent {
    pub fn new(llm: Arc<dyn LlmProvider>, tools: Arc<dyn ToolExecutor>) -> Self {
        Self {
            llm,
            tools,
            max_steps: DEFAULT_MAX_STEPS,
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }

    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max.max(1);
        self
    }

    /// Replace the system prompt; `None` sends none
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    /// Run one assistant turn over `history`
    ///
    /// Always ends the stream with `finish`, after an `error` event when the
    /// provider or tool listing fails. Returns the number of model steps run.
    pub async fn run(
        &self,
        history: Vec<Message>,
        events: UnboundedSender<UiStreamEvent>,
    ) -> Result<usize> {
        let message_id = format!("msg-{}", uuid::Uuid::new_v4().simple());
        emit(
            &events,
            UiStreamEvent::Start {
                message_id: Some(message_id.clone()),
            },
        )?;

        match self.run_steps(&message_id, history, &events).await {
            Ok(steps) => {
                emit(&events, UiStreamEvent::Finish)?;
                Ok(steps)
            }
            Err(e) if e.is::<Disconnected>() => Err(e),
            Err(e) => {
                tracing::error!("Chat turn failed: {:#}", e);
                emit(
                    &events,
                    UiStreamEvent::Error {
                        error_text: e.to_string(),
                    },
                )?;
                emit(&events, UiStreamEvent::Finish)?;
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        message_id: &str,
        history: Vec<Message>,
        events: &UnboundedSender<UiStreamEvent>,
    ) -> Result<usize> {
        let definitions = self.tools.definitions().await?;
        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            messages.push(Message::system(prompt.clone()));
        }
        messages.extend(history);

        let mut steps = 0;
        while steps < self.max_steps {
            steps += 1;
            emit(events, UiStreamEvent::StartStep)?;

            let text_id = format!("{}-text-{}", message_id, steps);
            let text_started = Arc::new(AtomicBool::new(false));
            let callback = text_callback(events.clone(), text_id.clone(), text_started.clone());

            let response = self
                .llm
                .chat_streaming(&messages, Some(&definitions), callback)
                .await;
            if text_started.load(Ordering::SeqCst) {
                emit(events, UiStreamEvent::TextEnd { id: text_id })?;
            }
            let response = response?;

            if let Some(usage) = response.usage() {
                tracing::debug!(
                    step = steps,
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    "Model step complete"
                );
            }

            let calls = response.tool_calls().to_vec();
            let text = response.text().map(str::to_string);
            if calls.is_empty() {
                emit(events, UiStreamEvent::FinishStep)?;
                break;
            }

            messages.push(Message::assistant_with_tools(text, &calls));
            for call in &calls {
                emit(
                    events,
                    UiStreamEvent::ToolInputAvailable {
                        tool_call_id: call.id.clone(),
                        tool_name: call.name.clone(),
                        input: call.arguments.clone(),
                    },
                )?;

                tracing::info!(tool = %call.name, "Executing tool call");
                let outcome = self.tools.execute(&call.name, call.arguments.clone()).await;
                let (event, content) = match outcome {
                    Ok(result) if !result.is_error => {
                        let content = result.to_text();
                        let output = serde_json::to_value(&result).unwrap_or(Value::Null);
                        (
                            UiStreamEvent::ToolOutputAvailable {
                                tool_call_id: call.id.clone(),
                                output,
                            },
                            content,
                        )
                    }
                    Ok(result) => {
                        let error_text = result.to_text();
                        (
                            UiStreamEvent::ToolOutputError {
                                tool_call_id: call.id.clone(),
                                error_text: error_text.clone(),
                            },
                            error_text,
                        )
                    }
                    Err(e) => {
                        tracing::warn!(tool = %call.name, "Tool call failed: {:#}", e);
                        let error_text = format!("{:#}", e);
                        (
                            UiStreamEvent::ToolOutputError {
                                tool_call_id: call.id.clone(),
                                error_text: error_text.clone(),
                            },
                            error_text,
                        )
                    }
                };
                emit(events, event)?;
                messages.push(Message::tool_result(call.id.clone(), content));
            }

            emit(events, UiStreamEvent::FinishStep)?;
        }

        Ok(steps)
    }
}

fn emit(events: &UnboundedSender<UiStreamEvent>, event: UiStreamEvent) -> Result<()> {
    events.send(event).map_err(|_| Disconnected.into())
}

/// Forward text deltas, opening the text part on the first one
fn text_callback(
    events: UnboundedSender<UiStreamEvent>,
    id: String,
    started: Arc<AtomicBool>,
) -> StreamCallback {
    Box::new(move |event: StreamEvent| match event {
        StreamEvent::TextDelta(delta) => {
            if !started.swap(true, Ordering::SeqCst) {
                let _ = events.send(UiStreamEvent::TextStart { id: id.clone() });
            }
            let _ = events.send(UiStreamEvent::TextDelta {
                id: id.clone(),
                delta,
            });
        }
        StreamEvent::ToolCallStart { name, .. } => {
            tracing::debug!("Tool call starting: {}", name);
        }
        StreamEvent::Error(err) => {
            tracing::error!("Streaming error: {}", err);
        }
        _ => {}
    })
}
