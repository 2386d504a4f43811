//! MCP (Model Context Protocol) over streamable HTTP.
//!
//! The server side exposes the CMR search as the `get_collections` tool;
//! the client side is what the chat backend uses to reach it.

pub mod client;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;

// Re-export main types
pub use client::McpClient;
pub use server::{router, run_mcp_server};
pub use tools::{GetCollectionsTool, McpTool, ToolError, ToolRegistry};
pub use transport::HttpTransport;
pub use types::{JsonRpcError, McpContent, McpToolDef, McpToolResult, ServerCapabilities};
