//! cmr-chat: chat with a language model about NASA Earth-science datasets
//!
//! This library provides:
//! - An MCP tool server exposing `get_collections`, a keyword search over
//!   NASA's Common Metadata Repository (CMR)
//! - A streaming chat backend that runs a multi-step tool loop against an
//!   OpenAI-compatible LLM and calls tools through an MCP client
//! - A terminal chat client built on a typed message/part model
//! - A renderer turning arbitrary tool results into a display tree

pub mod chat;
pub mod client;
pub mod cmr;
pub mod config;
pub mod llm;
pub mod mcp;
pub mod render;
pub mod sse;

pub use config::Config;
