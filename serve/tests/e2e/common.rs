//! Shared harness: spawn a once-mode server with a scripted engine, connect a
//! WebSocket client, collect events.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use switchboard::{AgentRegistry, Engine, MockLlm, ModelResponse, Settings};

pub fn scripted_engine(script: Vec<ModelResponse>) -> Arc<Engine> {
    let prompts =
        switchboard::prompts::load_or_default(Some(std::path::Path::new("/nonexistent-prompts")));
    Arc::new(
        Engine::new(
            Settings::default(),
            prompts,
            Arc::new(AgentRegistry::new()),
            Arc::new(MockLlm::new(script)),
        )
        .unwrap(),
    )
}

pub fn text_response(content: &str) -> ModelResponse {
    ModelResponse {
        content: content.to_string(),
        ..Default::default()
    }
}

pub struct TestServer {
    pub url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Binds to an ephemeral port and serves one connection (once mode).
    pub async fn spawn(engine: Arc<Engine>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            serve::run_serve_on_listener(engine, listener, true)
                .await
                .expect("server run");
        });
        Self {
            url: format!("ws://{}/ws", addr),
            handle,
        }
    }

    /// Waits for the server to exit (once mode: after the client disconnects).
    pub async fn shutdown(self) {
        let _ = self.handle.await;
    }
}

pub type Client = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

pub async fn connect(url: &str) -> Client {
    let (client, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    client
}

pub async fn send_json(client: &mut Client, value: serde_json::Value) {
    client
        .send(WsMessage::Text(value.to_string()))
        .await
        .unwrap();
}

/// Reads events until one of `type` ∈ `until` arrives (inclusive).
pub async fn collect_until(client: &mut Client, until: &[&str]) -> Vec<serde_json::Value> {
    let mut events = Vec::new();
    while let Some(msg) = client.next().await {
        let msg = msg.unwrap();
        let WsMessage::Text(text) = msg else { continue };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let event_type = value["type"].as_str().unwrap_or("").to_string();
        events.push(value);
        if until.contains(&event_type.as_str()) {
            break;
        }
    }
    events
}
