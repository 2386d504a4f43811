//! Streamable HTTP MCP server.
//!
//! Stateless: every `POST` carries one JSON-RPC message or a batch and is
//! answered with a JSON body. There is no server-initiated stream and no
//! session, so `GET` and `DELETE` on the endpoint are refused.

use super::tools::ToolRegistry;
use super::types::{
    Implementation, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ServerCapabilities, ToolsCapability, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    LATEST_PROTOCOL_VERSION, METHOD_NOT_FOUND, PARSE_ERROR, SESSION_HEADER,
    SUPPORTED_PROTOCOL_VERSIONS,
};
use crate::cmr::CmrClient;
use crate::config::{CmrConfig, McpServerConfig};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "common-metadata-repository";

struct McpState {
    registry: ToolRegistry,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Build the MCP router for a tool registry
pub fn router(registry: ToolRegistry, config: &McpServerConfig) -> Router {
    let state = Arc::new(McpState { registry });

    Router::new()
        .route(
            &config.path,
            post(handle_post)
                .get(method_not_allowed)
                .delete(method_not_allowed),
        )
        .layer(cors_layer(&config.allowed_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(SESSION_HEADER)])
}

/// Run the MCP server until the process exits
pub async fn run_mcp_server(config: &McpServerConfig, cmr: &CmrConfig) -> Result<()> {
    let client = CmrClient::new(cmr).context("Failed to build CMR client")?;
    let app = router(ToolRegistry::with_defaults(client), config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid MCP listen address {}:{}", config.host, config.port))?;
    tracing::info!("MCP server listening on http://{}{}", addr, config.path);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed: this server does not open SSE streams" })),
    )
}

async fn handle_post(State(state): State<Arc<McpState>>, body: Bytes) -> Response {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Rejecting unparseable MCP request: {}", e);
            let error = JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e));
            return (
                StatusCode::BAD_REQUEST,
                Json(JsonRpcResponse::failure(Value::Null, error)),
            )
                .into_response();
        }
    };

    match message {
        Value::Array(batch) if batch.is_empty() => {
            let error = JsonRpcError::new(INVALID_REQUEST, "Empty batch");
            (
                StatusCode::BAD_REQUEST,
                Json(JsonRpcResponse::failure(Value::Null, error)),
            )
                .into_response()
        }
        Value::Array(batch) => {
            let mut responses = Vec::new();
            for message in batch {
                if let Some(response) = handle_message(&state, message).await {
                    responses.push(response);
                }
            }
            if responses.is_empty() {
                StatusCode::ACCEPTED.into_response()
            } else {
                (StatusCode::OK, Json(responses)).into_response()
            }
        }
        message => match handle_message(&state, message).await {
            Some(response) => (StatusCode::OK, Json(response)).into_response(),
            None => StatusCode::ACCEPTED.into_response(),
        },
    }
}

/// Handle one JSON-RPC message; `None` for notifications and client responses
async fn handle_message(state: &McpState, message: Value) -> Option<JsonRpcResponse> {
    if message.get("method").is_none()
        && (message.get("result").is_some() || message.get("error").is_some())
    {
        return None;
    }

    let request: JsonRpcRequest = match serde_json::from_value(message) {
        Ok(request) => request,
        Err(e) => {
            let error = JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e));
            return Some(JsonRpcResponse::failure(Value::Null, error));
        }
    };

    if request.is_notification() {
        tracing::debug!("MCP notification: {}", request.method);
        return None;
    }

    tracing::debug!("MCP request: {}", request.method);
    let id = request.id.clone().unwrap_or(Value::Null);
    let response = match dispatch(state, &request.method, request.params).await {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(error) => {
            tracing::debug!("MCP request {} failed: {}", request.method, error);
            JsonRpcResponse::failure(id, error)
        }
    };
    Some(response)
}

async fn dispatch(
    state: &McpState,
    method: &str,
    params: Option<Value>,
) -> Result<Value, JsonRpcError> {
    match method {
        "initialize" => Ok(initialize(params.as_ref())),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": state.registry.definitions() })),
        "tools/call" => {
            let params: CallToolParams = params
                .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Missing params"))
                .and_then(|p| {
                    serde_json::from_value(p)
                        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, e.to_string()))
                })?;

            tracing::info!(tool = %params.name, "Tool call");
            match state.registry.call(&params.name, params.arguments).await {
                Some(Ok(result)) => serde_json::to_value(result)
                    .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, e.to_string())),
                Some(Err(e)) => Err(JsonRpcError::new(INVALID_PARAMS, e.to_string())),
                None => Err(JsonRpcError::new(
                    INVALID_PARAMS,
                    format!("Unknown tool: {}", params.name),
                )),
            }
        }
        other => Err(JsonRpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        )),
    }
}

fn initialize(params: Option<&Value>) -> Value {
    let requested = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str);
    let protocol_version = match requested {
        Some(version) if SUPPORTED_PROTOCOL_VERSIONS.contains(&version) => version,
        _ => LATEST_PROTOCOL_VERSION,
    };

    let result = InitializeResult {
        protocol_version: protocol_version.to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {
                list_changed: false,
            }),
        },
        server_info: Implementation {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };
    json!(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_echoes_supported_version() {
        let result = initialize(Some(&json!({"protocolVersion": "2024-11-05"})));
        assert_eq!(result["protocolVersion"], json!("2024-11-05"));
        assert_eq!(result["serverInfo"]["name"], json!(SERVER_NAME));
        assert_eq!(result["capabilities"]["tools"]["listChanged"], json!(false));

        let result = initialize(Some(&json!({"protocolVersion": "1999-01-01"})));
        assert_eq!(result["protocolVersion"], json!(LATEST_PROTOCOL_VERSION));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let state = McpState {
            registry: ToolRegistry::new(),
        };
        let response = handle_message(
            &state,
            json!({"jsonrpc": "2.0", "id": 1, "method": "resources/list"}),
        )
        .await
        .unwrap();
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_params() {
        let state = McpState {
            registry: ToolRegistry::new(),
        };
        let response = handle_message(
            &state,
            json!({
                "jsonrpc": "2.0",
                "id": "a",
                "method": "tools/call",
                "params": {"name": "nope", "arguments": {}}
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.id, json!("a"));
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_notifications_and_client_responses_get_no_reply() {
        let state = McpState {
            registry: ToolRegistry::new(),
        };
        let note = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(handle_message(&state, note).await.is_none());
        let reply = json!({"jsonrpc": "2.0", "id": 3, "result": {}});
        assert!(handle_message(&state, reply).await.is_none());
    }
}
