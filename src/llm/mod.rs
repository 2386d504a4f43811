//! LLM provider implementations

use crate::config::LlmConfig;

mod error;
mod openai_compat;
mod scripted;
mod types;

pub use error::LlmError;
pub use openai_compat::{AuthMethod, OpenAiCompatConfig, OpenAiCompatProvider};
pub use scripted::ScriptedProvider;
pub use types::*;

use anyhow::Result;
use async_trait::async_trait;

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Send a streaming chat completion request
    ///
    /// The callback is invoked for each chunk as it arrives from the LLM;
    /// the returned response holds the accumulated text and tool calls.
    async fn chat_streaming(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        callback: StreamCallback,
    ) -> Result<LlmResponse>;
}

/// Create an LLM provider from configuration
pub fn create_provider(config: &LlmConfig) -> Result<Box<dyn LlmProvider>> {
    match config.provider.to_lowercase().as_str() {
        "openai" | "openai-compatible" => {
            let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                LlmError::Unauthorized(format!(
                    "{} environment variable not set",
                    config.api_key_env
                ))
            })?;
            let compat = OpenAiCompatConfig::new(
                "openai",
                config.base_url.clone(),
                AuthMethod::BearerToken(api_key),
            )
            .with_model(config.model.clone())
            .with_max_tokens(config.max_tokens);
            Ok(Box::new(OpenAiCompatProvider::new(compat)))
        }
        // Local servers (Ollama, llama.cpp, vLLM) usually take no key
        "local" => {
            let compat = OpenAiCompatConfig::new(
                "local",
                config.base_url.clone(),
                AuthMethod::None,
            )
            .with_model(config.model.clone())
            .with_max_tokens(config.max_tokens);
            Ok(Box::new(OpenAiCompatProvider::new(compat)))
        }
        "scripted" | "offline" => Ok(Box::new(ScriptedProvider::new())),
        other => anyhow::bail!(
            "Unknown LLM provider: {}. Supported: openai, local, scripted",
            other
        ),
    }
}
