//! Terminal chat client: transport, session and command-line front end

pub mod cli;
pub mod session;
pub mod transport;

pub use session::ChatSession;
pub use transport::{decode_event_stream, ChatTransport, EventStream, HttpChatTransport};
