//! Streaming transport to the chat endpoint

use crate::chat::{ConversationError, Frame, UiEventDecoder, UiMessage, UiStreamEvent};
use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;

/// Decoded events of one turn, in arrival order
pub type EventStream = BoxStream<'static, Result<UiStreamEvent, ConversationError>>;

/// Opens one streamed turn for a conversation snapshot
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(&self, messages: Vec<UiMessage>) -> Result<EventStream, ConversationError>;
}

/// HTTP implementation posting `{ "messages": [...] }`
pub struct HttpChatTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpChatTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn open(&self, messages: Vec<UiMessage>) -> Result<EventStream, ConversationError> {
        tracing::debug!(
            "POST {} with {} message(s)",
            self.endpoint,
            messages.len()
        );
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "messages": messages }))
            .send()
            .await
            .map_err(|e| {
                ConversationError::Transport(format!("Failed to reach {}: {}", self.endpoint, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConversationError::Transport(format!(
                "Chat endpoint returned HTTP {}: {}",
                status, body
            )));
        }

        Ok(decode_event_stream(response.bytes_stream()))
    }
}

struct DecodeState<S> {
    body: S,
    decoder: UiEventDecoder,
    pending: VecDeque<Frame>,
    finished: bool,
}

/// Turn a chunked response body into stream events
///
/// Stops at `[DONE]` or when the body ends; a body error is yielded once as
/// a transport error and ends the stream.
pub fn decode_event_stream<S, B, E>(body: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: UiEventDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.pending.pop_front() {
                match frame {
                    Frame::Event(event) => return Some((Ok(event), state)),
                    Frame::Done => {
                        state.pending.clear();
                        state.finished = true;
                        return None;
                    }
                }
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let frames = state.decoder.push(chunk.as_ref());
                    state.pending.extend(frames);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    let error = ConversationError::Transport(format!("Stream interrupted: {}", e));
                    return Some((Err(error), state));
                }
                None => {
                    state.finished = true;
                    let frames = state.decoder.finish();
                    state.pending.extend(frames);
                }
            }
        }
    })
    .boxed()
}
