#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use askleo::{
    error::UpstreamError,
    middleware::auth::{issue_token, TokenValidator},
    models::{Rule, Suggestion, TextRange},
    routes::{build_router, AppState},
    services::{SessionRegistry, SessionSettings, SuggestionSource},
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

pub const SECRET: &str = "integration-secret";
pub const NOTE: &str = "Pt hasnt felt rite today.";

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Corrects "hasnt" and "rite" wherever they appear.
pub struct FixedSource;

#[async_trait]
impl SuggestionSource for FixedSource {
    async fn suggest(&self, text: &str) -> Result<Vec<Suggestion>, UpstreamError> {
        let fixes = [("hasnt", "hasn't"), ("rite", "right")];
        Ok(fixes
            .iter()
            .filter_map(|(wrong, right)| {
                let from = text[..text.find(wrong)?].chars().count();
                Some(Suggestion {
                    id: Uuid::now_v7(),
                    range: TextRange::new(from, from + wrong.chars().count())?,
                    replacement: right.to_string(),
                    rule: Rule::Spelling,
                    explanation: "Misspelling.".into(),
                })
            })
            .collect())
    }
}

pub fn settings() -> SessionSettings {
    SessionSettings {
        upstream_timeout: Duration::from_secs(5),
        idle_timeout: Duration::from_secs(600),
        send_timeout: SessionSettings::DEFAULT_SEND_TIMEOUT,
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: Arc<SessionRegistry>,
}

impl TestServer {
    pub fn ws_url(&self) -> String {
        format!("ws://{}/suggest", self.addr)
    }
}

pub async fn spawn_server(source: Arc<dyn SuggestionSource>, settings: SessionSettings) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    serve_on(listener, source, settings)
}

/// Serves the suggestion channel on an already bound listener.
pub fn serve_on(
    listener: tokio::net::TcpListener,
    source: Arc<dyn SuggestionSource>,
    settings: SessionSettings,
) -> TestServer {
    let registry = Arc::new(SessionRegistry::new());
    let state = AppState {
        validator: Arc::new(TokenValidator::new(SECRET, None)),
        source,
        registry: Arc::clone(&registry),
        settings,
    };
    let app = build_router(state, None);

    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer { addr, registry }
}

pub fn token() -> String {
    issue_token("user-1", "authenticated", "authenticated", chrono::Duration::minutes(5), SECRET).unwrap()
}

pub fn expired_token() -> String {
    issue_token("user-1", "authenticated", "authenticated", chrono::Duration::minutes(-5), SECRET).unwrap()
}

pub async fn connect_with_query(server: &TestServer, token: &str) -> Client {
    let url = format!("{}?token={}", server.ws_url(), token);
    let (ws, _resp) = tokio_tungstenite::connect_async(&url).await.expect("handshake ok");
    ws
}

pub fn request_frame(text: &str) -> Message {
    let frame = json!({ "docId": Uuid::now_v7().to_string(), "text": text });
    Message::Text(frame.to_string().into())
}

pub async fn send_text(ws: &mut Client, text: &str) {
    ws.send(request_frame(text)).await.unwrap();
}

/// Next text frame as JSON, skipping control frames.
pub async fn next_json(ws: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(10), ws.next())
            .await
            .expect("server went quiet")
            .expect("socket ended")
            .expect("socket error");
        match frame {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame {other:?}"),
        }
    }
}

/// Reads one response: every suggestion payload, then the terminal message.
pub async fn read_response(ws: &mut Client) -> (Vec<Value>, Value) {
    let mut suggestions = Vec::new();
    loop {
        let message = next_json(ws).await;
        match message["type"].as_str() {
            Some("suggestion") => suggestions.push(message["payload"].clone()),
            _ => return (suggestions, message),
        }
    }
}

/// Chars of `text` covered by a `{from, to}` range payload.
pub fn covered(text: &str, range: &Value) -> String {
    let from = range["from"].as_u64().unwrap() as usize;
    let to = range["to"].as_u64().unwrap() as usize;
    text.chars().skip(from).take(to - from).collect()
}

/// An OpenAI-compatible `/chat/completions` that answers every request the same way.
#[derive(Clone)]
pub enum FakeCompletion {
    /// Streams `content` split into the given deltas, as server-sent events.
    Stream(Vec<String>),
    /// Returns `content` as one non-streamed message.
    Message(String),
    /// Fails with this status.
    Status(u16),
}

pub async fn spawn_fake_openai(reply: FakeCompletion) -> String {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |Json(body): Json<Value>| {
            let reply = reply.clone();
            async move { completion_response(reply, body) }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v1")
}

fn completion_response(reply: FakeCompletion, body: Value) -> Response {
    match reply {
        FakeCompletion::Stream(deltas) => {
            assert_eq!(body["stream"], true);
            let mut events = String::from(
                "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            );
            for delta in deltas {
                let chunk = json!({ "choices": [{ "index": 0, "delta": { "content": delta } }] });
                events.push_str(&format!("data: {chunk}\n\n"));
            }
            events.push_str("data: [DONE]\n\n");
            ([(CONTENT_TYPE, "text/event-stream")], Body::from(events)).into_response()
        }
        FakeCompletion::Message(content) => {
            assert_eq!(body["response_format"]["type"], "json_object");
            Json(json!({
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
            }))
            .into_response()
        }
        FakeCompletion::Status(status) => (
            axum::http::StatusCode::from_u16(status).unwrap(),
            Json(json!({ "error": { "message": "upstream secret detail" } })),
        )
            .into_response(),
    }
}
