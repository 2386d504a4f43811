//! Configuration management for cmr-chat

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub chat: ChatConfig,
    pub mcp: McpServerConfig,
    pub cmr: CmrConfig,
}

/// LLM provider selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "openai" for any OpenAI-compatible endpoint, "scripted" for the offline provider
    pub provider: String,
    /// Full chat completions URL
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub max_tokens: usize,
    /// Optional system prompt prepended to every turn
    pub system_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 4096,
            system_prompt: None,
        }
    }
}

/// Chat backend and terminal client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub host: String,
    pub port: u16,
    /// MCP endpoint the chat backend calls tools on
    pub mcp_url: String,
    /// Maximum model steps per turn, tool calls included
    pub max_steps: usize,
    /// Greeting shown as the first assistant message in the terminal client
    pub greeting: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            mcp_url: "http://localhost:5001/mcp".to_string(),
            max_steps: 5,
            greeting: "Hello! How can I help you today?".to_string(),
        }
    }
}

impl ChatConfig {
    /// URL the terminal client posts conversations to
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}/chat", self.host, self.port)
    }
}

/// MCP tool server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpServerConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Origins allowed by CORS (MCP Inspector and web UI)
    pub allowed_origins: Vec<String>,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5001,
            path: "/mcp".to_string(),
            allowed_origins: vec![
                "http://127.0.0.1:6274".to_string(),
                "http://localhost:6274".to_string(),
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// Common Metadata Repository search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmrConfig {
    pub base_url: String,
    pub page_size: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for CmrConfig {
    fn default() -> Self {
        Self {
            base_url: "https://cmr.earthdata.nasa.gov/search/collections.json".to_string(),
            page_size: 5,
            timeout_secs: 10,
            user_agent: format!("cmr-chat-mcp/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CmrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "cmr-chat") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Ok(PathBuf::from("config.toml"))
        }
    }
}
