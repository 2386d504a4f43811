//! Tools served by the MCP endpoint.

use super::types::{McpToolDef, McpToolResult};
use crate::cmr::CmrClient;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

/// Why a tool call did not produce output
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments did not match the input schema (JSON-RPC -32602)
    #[error("Invalid arguments: {0}")]
    InvalidParams(String),

    /// The tool ran and failed; reported to the caller as `isError`
    #[error("{0}")]
    Failed(String),
}

/// A tool exposed over MCP
#[async_trait]
pub trait McpTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema for the `arguments` object
    fn input_schema(&self) -> Value;

    async fn call(&self, arguments: Value) -> Result<String, ToolError>;

    fn to_def(&self) -> McpToolDef {
        McpToolDef {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Registered tools, in registration order
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn McpTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry serving `get_collections` against the given CMR client
    pub fn with_defaults(cmr: CmrClient) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GetCollectionsTool::new(cmr)));
        registry
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn McpTool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn McpTool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn definitions(&self) -> Vec<McpToolDef> {
        self.tools.iter().map(|t| t.to_def()).collect()
    }

    /// Run a tool; `None` when no tool has that name
    ///
    /// Tool failures become `isError` results; only argument errors are
    /// returned as `Err`.
    pub async fn call(
        &self,
        name: &str,
        arguments: Value,
    ) -> Option<Result<McpToolResult, ToolError>> {
        let tool = self.get(name)?;
        let result = match tool.call(arguments).await {
            Ok(output) => Ok(McpToolResult::text(output)),
            Err(ToolError::Failed(message)) => {
                tracing::warn!(tool = name, "Tool call failed: {}", message);
                Ok(McpToolResult::error(message))
            }
            Err(e) => Err(e),
        };
        Some(result)
    }
}

#[derive(Debug, Default, Deserialize)]
struct GetCollectionsArgs {
    #[serde(default)]
    keyword: Option<String>,
}

/// Keyword search over NASA CMR collection records
pub struct GetCollectionsTool {
    cmr: CmrClient,
}

impl GetCollectionsTool {
    pub fn new(cmr: CmrClient) -> Self {
        Self { cmr }
    }
}

#[async_trait]
impl McpTool for GetCollectionsTool {
    fn name(&self) -> &str {
        "get_collections"
    }

    fn description(&self) -> &str {
        "Search NASA's Common Metadata Repository (CMR) collection records using full text search."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "keyword": {
                    "type": "string",
                    "default": "",
                    "description": "Free-text keyword, e.g. \"sea surface temperature\""
                }
            }
        })
    }

    async fn call(&self, arguments: Value) -> Result<String, ToolError> {
        let args: GetCollectionsArgs = match arguments {
            Value::Null => GetCollectionsArgs::default(),
            other => serde_json::from_value(other)
                .map_err(|e| ToolError::InvalidParams(e.to_string()))?,
        };

        self.cmr
            .get_collections(args.keyword.as_deref())
            .await
            .map_err(|e| ToolError::Failed(e.to_string()))
    }
}
