//! Conversation errors

use super::message::UiRole;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConversationError {
    /// No message in the sequence is from the user
    #[error("Conversation has no user message")]
    MissingUserMessage,

    /// The first message is not from the user
    #[error("Conversation must start with a user message, found {0}")]
    LeadingMessageNotUser(UiRole),

    /// A reply is still streaming for this session
    #[error("A reply is still streaming; wait for it or cancel it first")]
    TurnInProgress,

    #[error("Message is empty")]
    EmptyInput,

    /// Connect failure, non-2xx status, broken body or `error` event
    #[error("Transport error: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            ConversationError::LeadingMessageNotUser(UiRole::Assistant).to_string(),
            "Conversation must start with a user message, found assistant"
        );
        assert_eq!(
            ConversationError::Transport("HTTP 500".into()).to_string(),
            "Transport error: HTTP 500"
        );
    }
}
