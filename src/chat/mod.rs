//! Chat message model and the streaming chat backend

pub mod agent;
pub mod conversation;
pub mod convert;
pub mod error;
pub mod message;
pub mod server;
pub mod stream;

pub use agent::{ChatAgent, ToolExecutor};
pub use conversation::{Conversation, SessionUpdate};
pub use error::ConversationError;
pub use message::{MessageStatus, UiMessage, UiPart, UiRole};
pub use server::{router, run_chat_server, ChatState};
pub use stream::{Frame, UiEventDecoder, UiStreamEvent};
