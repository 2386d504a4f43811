//! Chat backend end to end: scripted model, real MCP server, CMR stand-in

use axum::extract::RawQuery;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use cmr_chat::chat::{
    self, ChatState, Conversation, Frame, MessageStatus, SessionUpdate, UiEventDecoder,
    UiMessage, UiPart, UiRole, UiStreamEvent,
};
use cmr_chat::client::{ChatSession, HttpChatTransport};
use cmr_chat::cmr::CmrClient;
use cmr_chat::config::{ChatConfig, CmrConfig, McpServerConfig};
use cmr_chat::llm::{LlmProvider, ScriptedProvider};
use cmr_chat::mcp::{self, ToolRegistry};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// An address nothing listens on
async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/mcp", addr)
}

async fn fake_cmr() -> String {
    let app = Router::new().route(
        "/search/collections.json",
        get(|RawQuery(query): RawQuery| async move {
            if query.unwrap_or_default().contains("keyword=boom") {
                return (StatusCode::BAD_GATEWAY, "upstream exploded").into_response();
            }
            Json(json!({
                "feed": { "entry": [
                    { "id": "C1-NSIDC", "title": "Sea Ice Index", "summary": "Daily extent" },
                    { "id": "C2-NSIDC", "title": "Sea Ice Concentration", "summary": "" }
                ]}
            }))
            .into_response()
        }),
    );
    format!("{}/search/collections.json", serve(app).await)
}

async fn mcp_server() -> String {
    let cmr = CmrClient::new(&CmrConfig {
        base_url: fake_cmr().await,
        ..CmrConfig::default()
    })
    .unwrap();
    let config = McpServerConfig::default();
    let app = mcp::router(ToolRegistry::with_defaults(cmr), &config);
    format!("{}{}", serve(app).await, config.path)
}

/// Start a chat backend using the scripted provider; returns the `/chat` URL
async fn chat_server(mcp_url: String) -> String {
    let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider::new());
    let state = ChatState::new(
        provider,
        &ChatConfig {
            mcp_url,
            ..ChatConfig::default()
        },
    );
    format!("{}/chat", serve(chat::router(Arc::new(state))).await)
}

fn user(text: &str) -> Value {
    json!({ "id": "u1", "role": "user", "parts": [{ "type": "text", "text": text }] })
}

async fn post_chat(url: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap()
}

fn decode(body: &[u8]) -> (Vec<UiStreamEvent>, bool) {
    let mut decoder = UiEventDecoder::new();
    let mut frames = decoder.push(body);
    frames.extend(decoder.finish());

    let mut events = Vec::new();
    let mut done = false;
    for frame in frames {
        match frame {
            Frame::Event(event) => events.push(event),
            Frame::Done => done = true,
        }
    }
    (events, done)
}

fn position(events: &[UiStreamEvent], pred: impl Fn(&UiStreamEvent) -> bool) -> usize {
    events.iter().position(pred).expect("event not found")
}

#[tokio::test]
async fn test_chat_streams_tool_call_and_answer() {
    let url = chat_server(mcp_server().await).await;
    let response = post_chat(
        &url,
        json!({ "messages": [user("Find collections related to sea ice")] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["content-type"], "application/octet-stream");
    assert_eq!(headers["x-vercel-ai-ui-message-stream"], "v1");

    let body = response.bytes().await.unwrap();
    let (events, done) = decode(&body);
    assert!(done);

    assert!(matches!(events.first(), Some(UiStreamEvent::Start { .. })));
    assert_eq!(events.last(), Some(&UiStreamEvent::Finish));

    let input = position(&events, |e| {
        matches!(e, UiStreamEvent::ToolInputAvailable { tool_name, input, .. }
            if tool_name == "get_collections" && input == &json!({"keyword": "sea ice"}))
    });
    let output = position(&events, |e| {
        matches!(e, UiStreamEvent::ToolOutputAvailable { .. })
    });
    let text = position(&events, |e| matches!(e, UiStreamEvent::TextDelta { .. }));
    assert!(input < output && output < text);

    let answer: String = events
        .iter()
        .filter_map(|e| match e {
            UiStreamEvent::TextDelta { delta, .. } => Some(delta.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        answer,
        "I found 2 collections:\n- Sea Ice Index (C1-NSIDC)\n- Sea Ice Concentration (C2-NSIDC)\n"
    );
}

#[tokio::test]
async fn test_upstream_failure_streams_tool_error() {
    let url = chat_server(mcp_server().await).await;
    let response = post_chat(&url, json!([user("data about boom")])).await;
    let (events, _) = decode(&response.bytes().await.unwrap());

    assert!(events.iter().any(|e| matches!(
        e,
        UiStreamEvent::ToolOutputError { error_text, .. }
            if error_text.starts_with("Failed to search CMR collections")
    )));
    assert_eq!(events.last(), Some(&UiStreamEvent::Finish));
}

#[tokio::test]
async fn test_leading_assistant_is_rejected_before_tools() {
    // Nothing listens on the MCP URL: a 400 proves it was never contacted
    let url = chat_server(dead_url().await).await;
    let response = post_chat(
        &url,
        json!({ "messages": [
            { "id": "msg-1", "role": "assistant", "parts": [{ "type": "text", "text": "Hello!" }] },
            user("hi")
        ]}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("user"));

    let response = post_chat(&url, json!({ "messages": [] })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unreachable_tool_server_is_bad_gateway() {
    let url = chat_server(dead_url().await).await;
    let response = post_chat(&url, json!({ "messages": [user("hi")] })).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Tool server unavailable"));
}

#[tokio::test]
async fn test_in_process_tools_skip_mcp() {
    let cmr = CmrClient::new(&CmrConfig {
        base_url: fake_cmr().await,
        ..CmrConfig::default()
    })
    .unwrap();
    let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider::new());
    let state = ChatState::new(
        provider,
        &ChatConfig {
            mcp_url: dead_url().await,
            ..ChatConfig::default()
        },
    )
    .with_tools(Arc::new(ToolRegistry::with_defaults(cmr)));
    let url = format!("{}/chat", serve(chat::router(Arc::new(state))).await);

    let response = post_chat(&url, json!({ "messages": [user("sea ice")] })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let (events, done) = decode(&response.bytes().await.unwrap());
    assert!(done);
    assert!(events
        .iter()
        .any(|e| matches!(e, UiStreamEvent::ToolOutputAvailable { .. })));
}

async fn drain(session: &mut ChatSession) -> Vec<SessionUpdate> {
    let mut updates = Vec::new();
    while let Some(update) = session.recv().await {
        updates.push(update);
    }
    updates
}

#[tokio::test]
async fn test_session_builds_conversation() {
    let url = chat_server(mcp_server().await).await;
    let mut session = ChatSession::new(
        Arc::new(HttpChatTransport::new(url)),
        Conversation::with_greeting("Hello! How can I help you today?"),
    );

    session.send("collections about sea ice").unwrap();
    let updates = drain(&mut session).await;
    assert!(matches!(updates.first(), Some(SessionUpdate::Started { .. })));
    assert!(matches!(updates.last(), Some(SessionUpdate::Finished { .. })));

    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].id, "msg-1");

    let reply: &UiMessage = &messages[2];
    assert_eq!(reply.role, UiRole::Assistant);
    assert_eq!(reply.status, MessageStatus::Complete);
    assert!(matches!(
        &reply.parts[0],
        UiPart::ToolCall { tool_name, .. } if tool_name == "get_collections"
    ));
    match &reply.parts[1] {
        UiPart::ToolResult {
            tool_name,
            output,
            is_error,
            ..
        } => {
            assert_eq!(tool_name, "get_collections");
            assert!(!is_error);
            assert!(output["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("C1-NSIDC"));
        }
        other => panic!("expected tool result, got {:?}", other),
    }
    assert!(reply.text().starts_with("I found 2 collections"));

    // A second turn carries the whole transcript
    session.send("and about ozone?").unwrap();
    let updates = drain(&mut session).await;
    assert!(matches!(updates.last(), Some(SessionUpdate::Finished { .. })));
    assert_eq!(session.conversation().messages().len(), 5);
}

#[tokio::test]
async fn test_session_survives_backend_failure() {
    let url = chat_server(dead_url().await).await;
    let mut session = ChatSession::new(
        Arc::new(HttpChatTransport::new(url)),
        Conversation::with_greeting("Hello!"),
    );

    session.send("hi").unwrap();
    let updates = drain(&mut session).await;
    assert!(matches!(
        updates.as_slice(),
        [SessionUpdate::Failed { message_id: None, error }] if error.contains("502")
    ));
    assert!(!session.is_busy());

    session.send("hi again").unwrap();
    drain(&mut session).await;
    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].text(), "Hello!");
    assert_eq!(messages[2].text(), "hi again");
}

#[tokio::test]
async fn test_session_reports_unreachable_backend() {
    let mut session = ChatSession::new(
        Arc::new(HttpChatTransport::new(dead_url().await)),
        Conversation::new(),
    );
    session.send("hi").unwrap();
    let updates = drain(&mut session).await;
    assert!(matches!(
        updates.as_slice(),
        [SessionUpdate::Failed { error, .. }] if error.starts_with("Failed to reach")
    ));
}
