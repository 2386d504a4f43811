//! Streamable HTTP transport for MCP clients.
//!
//! Each JSON-RPC message is one `POST`. The server may answer with a plain
//! JSON body or with an SSE stream that carries the response.

use super::types::{JsonRpcRequest, JsonRpcResponse, SESSION_HEADER};
use crate::sse::SseDecoder;
use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// HTTP transport bound to one MCP endpoint
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    /// Request ID counter
    next_id: AtomicU64,
    /// Session assigned by the server, echoed on every later request
    session_id: RwLock<Option<String>>,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
            session_id: RwLock::new(None),
        }
    }

    async fn post(&self, message: &JsonRpcRequest) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(&self.url)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(message);
        if let Some(session) = self.session_id.read().await.as_deref() {
            request = request.header(SESSION_HEADER, session);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach MCP server at {}", self.url))?;

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.write().await = Some(session.to_string());
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("MCP server returned HTTP {}: {}", status, body);
        }
        Ok(response)
    }

    /// Send a request and wait for its response
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(Some(id), method, params);
        tracing::debug!("MCP request: {} (id {})", method, id);

        let response = self.post(&request).await?;
        let is_sse = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/event-stream"))
            .unwrap_or(false);
        let body = response
            .text()
            .await
            .context("Failed to read MCP response body")?;

        let response = if is_sse {
            find_sse_response(&body, id)?
        } else {
            serde_json::from_str::<JsonRpcResponse>(&body)
                .with_context(|| format!("Invalid MCP response: {}", body))?
        };

        if let Some(error) = response.error {
            return Err(error.into());
        }

        response
            .result
            .ok_or_else(|| anyhow::anyhow!("MCP response missing result"))
    }

    /// Send a notification (no response expected)
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = JsonRpcRequest::new(None, method, params);
        tracing::debug!("MCP notification: {}", method);
        self.post(&notification).await?;
        Ok(())
    }
}

/// Pick the response with the given id out of an SSE body
fn find_sse_response(body: &str, id: u64) -> Result<JsonRpcResponse> {
    let mut decoder = SseDecoder::new();
    let mut events = decoder.push(body.as_bytes());
    events.extend(decoder.finish());

    events
        .iter()
        .filter_map(|data| serde_json::from_str::<JsonRpcResponse>(data).ok())
        .find(|response| response.id == Value::from(id))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "MCP event stream ended without a response to request {}",
                id
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_sse_response_skips_other_messages() {
        let body = concat!(
            "event: message\n",
            "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\n\n",
            "event: message\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"tools\":[]}}\n\n",
        );
        let response = find_sse_response(body, 2).unwrap();
        assert_eq!(response.result.unwrap()["tools"], serde_json::json!([]));
    }

    #[test]
    fn test_find_sse_response_missing() {
        let body = "data: {\"jsonrpc\":\"2.0\",\"id\":9,\"result\":{}}\n\n";
        let err = find_sse_response(body, 1).unwrap_err();
        assert!(err.to_string().contains("request 1"));
    }
}
