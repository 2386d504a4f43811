//! HTTP chat endpoint
//!
//! `POST /chat` takes the UI transcript and answers with a UI message
//! stream; `GET /health` reports liveness.

use super::agent::{ChatAgent, ToolExecutor};
use super::convert::{require_leading_user, to_model_messages};
use super::message::UiMessage;
use super::stream::{encode_done, UiStreamEvent, STREAM_HEADER, STREAM_VERSION};
use crate::config::{ChatConfig, Config};
use crate::llm::{self, LlmProvider};
use crate::mcp::McpClient;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, OnceCell};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state
pub struct ChatState {
    provider: Arc<dyn LlmProvider>,
    mcp_url: String,
    /// Tool client, connected on first use; a failed connect is retried
    /// on the next request
    tools: OnceCell<Arc<dyn ToolExecutor>>,
    max_steps: usize,
    system_prompt: Option<String>,
}

impl ChatState {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &ChatConfig) -> Self {
        Self {
            provider,
            mcp_url: config.mcp_url.clone(),
            tools: OnceCell::new(),
            max_steps: config.max_steps,
            system_prompt: None,
        }
    }

    /// Use `tools` instead of connecting to the MCP server
    pub fn with_tools(mut self, tools: Arc<dyn ToolExecutor>) -> Self {
        self.tools = OnceCell::from(tools);
        self
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    async fn tools(&self) -> Result<Arc<dyn ToolExecutor>> {
        let tools = self
            .tools
            .get_or_try_init(|| async {
                let client = McpClient::connect(&self.mcp_url).await?;
                Ok::<_, anyhow::Error>(Arc::new(client) as Arc<dyn ToolExecutor>)
            })
            .await?;
        Ok(tools.clone())
    }

    fn agent(&self, tools: Arc<dyn ToolExecutor>) -> ChatAgent {
        let agent = ChatAgent::new(self.provider.clone(), tools).with_max_steps(self.max_steps);
        match &self.system_prompt {
            Some(prompt) => agent.with_system_prompt(Some(prompt.clone())),
            None => agent,
        }
    }
}

/// Request body: `{ "messages": [...] }` or a bare message array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatRequest {
    Envelope { messages: Vec<UiMessage> },
    Bare(Vec<UiMessage>),
}

impl ChatRequest {
    fn into_messages(self) -> Vec<UiMessage> {
        match self {
            ChatRequest::Envelope { messages } | ChatRequest::Bare(messages) => messages,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    provider: String,
}

/// Build the chat router
pub fn router(state: Arc<ChatState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/chat", post(handle_chat))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the chat server
pub async fn run_chat_server(config: &Config) -> Result<()> {
    let provider: Arc<dyn LlmProvider> = Arc::from(llm::create_provider(&config.llm)?);
    tracing::info!("Chat provider: {}", provider.name());

    let state = ChatState::new(provider, &config.chat)
        .with_system_prompt(config.llm.system_prompt.clone());
    let app = router(Arc::new(state));

    let addr: SocketAddr = format!("{}:{}", config.chat.host, config.chat.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid chat listen address {}:{}",
                config.chat.host, config.chat.port
            )
        })?;
    tracing::info!("Chat server listening on {}", addr);
    tracing::info!("Tool server: {}", config.chat.mcp_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check(State(state): State<Arc<ChatState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: state.provider.name().to_string(),
    })
}

async fn handle_chat(
    State(state): State<Arc<ChatState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let messages = request.into_messages();
    if let Err(e) = require_leading_user(&messages) {
        tracing::debug!("Rejecting chat request: {}", e);
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response();
    }
    let history = to_model_messages(&messages);

    let tools = match state.tools().await {
        Ok(tools) => tools,
        Err(e) => {
            tracing::error!("Tool server unavailable: {:#}", e);
            return (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": format!("Tool server unavailable: {:#}", e) })),
            )
                .into_response();
        }
    };

    let (tx, rx) = mpsc::unbounded_channel::<UiStreamEvent>();
    let agent = state.agent(tools);
    tokio::spawn(async move {
        match agent.run(history, tx).await {
            Ok(steps) => tracing::debug!("Chat turn finished after {} step(s)", steps),
            Err(e) => tracing::debug!("Chat turn ended early: {}", e),
        }
    });

    let body = UnboundedReceiverStream::new(rx)
        .map(|event| Ok::<_, Infallible>(event.encode()))
        .chain(futures::stream::once(async {
            Ok::<_, Infallible>(encode_done())
        }));

    (
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (header::CONTENT_ENCODING, "none"),
            (header::HeaderName::from_static(STREAM_HEADER), STREAM_VERSION),
        ],
        Body::from_stream(body),
    )
        .into_response()
}
