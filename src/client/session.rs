//! One chat session: a conversation plus at most one in-flight turn

use super::transport::ChatTransport;
use crate::chat::{Conversation, ConversationError, SessionUpdate, UiStreamEvent};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Buffered stream items between the transport task and the update loop
const CHANNEL_CAPACITY: usize = 64;

enum TurnItem {
    Event(UiStreamEvent),
    Failed(ConversationError),
    Closed,
}

struct Turn {
    rx: mpsc::Receiver<TurnItem>,
    task: JoinHandle<()>,
}

/// Owns a conversation and drives turns against a transport
///
/// Updates are applied only from [`ChatSession::recv`], so the conversation
/// is never touched from the transport task. Dropping the session cancels
/// the in-flight turn.
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    conversation: Conversation,
    turn: Option<Turn>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn ChatTransport>, conversation: Conversation) -> Self {
        Self {
            transport,
            conversation,
            turn: None,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Whether a turn is waiting for events
    pub fn is_busy(&self) -> bool {
        self.turn.is_some()
    }

    /// Append a user message and start streaming the reply
    pub fn send(&mut self, text: &str) -> Result<(), ConversationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ConversationError::EmptyInput);
        }
        if self.turn.is_some() {
            return Err(ConversationError::TurnInProgress);
        }

        self.conversation.push_user(text);
        let outbound = self.conversation.outbound_messages()?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let transport = self.transport.clone();
        let task = tokio::spawn(async move {
            let mut events = match transport.open(outbound).await {
                Ok(events) => events,
                Err(e) => {
                    let _ = tx.send(TurnItem::Failed(e)).await;
                    return;
                }
            };
            while let Some(item) = events.next().await {
                let item = match item {
                    Ok(event) => TurnItem::Event(event),
                    Err(e) => TurnItem::Failed(e),
                };
                let failed = matches!(item, TurnItem::Failed(_));
                if tx.send(item).await.is_err() || failed {
                    return;
                }
            }
            let _ = tx.send(TurnItem::Closed).await;
        });

        self.turn = Some(Turn { rx, task });
        Ok(())
    }

    /// Wait for the next change to the conversation
    ///
    /// Returns `None` when no turn is in flight. A turn ends with
    /// `Finished` or `Failed`.
    pub async fn recv(&mut self) -> Option<SessionUpdate> {
        loop {
            let turn = self.turn.as_mut()?;
            let update = match turn.rx.recv().await {
                Some(TurnItem::Event(event)) => match self.conversation.apply(event) {
                    Some(update) => update,
                    None => continue,
                },
                Some(TurnItem::Failed(e)) => self.conversation.fail(failure_text(e)),
                Some(TurnItem::Closed) | None => self
                    .conversation
                    .fail("Connection closed before the reply finished"),
            };

            if matches!(
                update,
                SessionUpdate::Finished { .. } | SessionUpdate::Failed { .. }
            ) {
                self.end_turn();
            }
            return Some(update);
        }
    }

    /// Abort the in-flight turn, marking its message incomplete
    pub fn cancel(&mut self) -> Option<SessionUpdate> {
        self.turn.as_ref()?;
        self.end_turn();
        Some(
            self.conversation
                .cancel()
                .unwrap_or_else(|| self.conversation.fail("Cancelled")),
        )
    }

    fn end_turn(&mut self) {
        if let Some(turn) = self.turn.take() {
            turn.task.abort();
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.end_turn();
    }
}

fn failure_text(error: ConversationError) -> String {
    match error {
        ConversationError::Transport(message) => message,
        other => other.to_string(),
    }
}
