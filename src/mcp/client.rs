//! MCP client for the tool server (async).

use super::transport::HttpTransport;
use super::types::{InitializeResult, McpToolDef, McpToolResult, LATEST_PROTOCOL_VERSION};
use anyhow::{Context, Result};
use serde_json::{json, Value};

/// An initialized connection to one MCP server
pub struct McpClient {
    transport: HttpTransport,
    server: InitializeResult,
}

impl McpClient {
    /// Connect and run the `initialize` handshake
    pub async fn connect(url: &str) -> Result<Self> {
        let transport = HttpTransport::new(url);

        let result = transport
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": LATEST_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "cmr-chat",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                })),
            )
            .await
            .with_context(|| format!("Failed to initialize MCP session with {}", url))?;
        let server: InitializeResult =
            serde_json::from_value(result).context("Failed to parse initialize result")?;

        transport
            .notify("notifications/initialized", None)
            .await
            .context("Failed to send initialized notification")?;

        tracing::info!(
            "Connected to MCP server {} {} at {}",
            server.server_info.name,
            server.server_info.version,
            url
        );
        Ok(Self { transport, server })
    }

    /// Server identity and capabilities from the handshake
    pub fn server(&self) -> &InitializeResult {
        &self.server
    }

    pub async fn list_tools(&self) -> Result<Vec<McpToolDef>> {
        let result = self.transport.request("tools/list", None).await?;
        let tools = result.get("tools").cloned().unwrap_or(Value::Array(Vec::new()));
        serde_json::from_value(tools).context("Failed to parse tool list")
    }

    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<McpToolResult> {
        let result = self
            .transport
            .request(
                "tools/call",
                Some(json!({
                    "name": tool_name,
                    "arguments": arguments
                })),
            )
            .await
            .with_context(|| format!("Failed to call tool: {}", tool_name))?;

        serde_json::from_value(result).context("Failed to parse tool result")
    }
}
