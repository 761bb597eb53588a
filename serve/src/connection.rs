//! WebSocket connection lifecycle: one session, sequential turns.
//!
//! Each incoming `query` runs one engine turn. Progress events are forwarded
//! to the socket as they arrive (the turn runs in its own task so forwarding
//! and execution overlap); the next query is only read after the current turn
//! finishes, so turns on a connection never interleave.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use tokio::sync::oneshot;
use tracing::{info, warn};

use stream_event::{to_json, EnvelopeState, ProtocolEvent};
use switchboard::{Engine, ProgressSink};

use super::events::to_protocol;
use super::request::ClientRequest;

pub(crate) async fn handle_socket(
    mut socket: WebSocket,
    engine: Arc<Engine>,
    shutdown_tx: Option<oneshot::Sender<()>>,
) {
    let session_id = uuid::Uuid::new_v4().to_string();
    let mut envelope = EnvelopeState::new(session_id.clone());
    let mut history: Vec<switchboard::Message> = Vec::new();
    info!(session = %session_id, "session opened");

    while let Some(received) = socket.recv().await {
        let message = match received {
            Ok(m) => m,
            Err(e) => {
                warn!(session = %session_id, "read error (client closed?): {}", e);
                break;
            }
        };
        let text = match &message {
            WsMessage::Text(t) => t.clone(),
            WsMessage::Binary(b) => String::from_utf8_lossy(b).into_owned(),
            WsMessage::Close(_) => break,
            _ => continue,
        };

        let request: ClientRequest = match serde_json::from_str(&text) {
            Ok(r) => r,
            Err(e) => {
                let event = ProtocolEvent::Error {
                    message: format!("parse error: {}", e),
                };
                if send_event(&mut socket, &event, &mut envelope).await.is_err() {
                    break;
                }
                continue;
            }
        };

        let ClientRequest::Query { text: query } = request;
        match run_turn(&engine, &mut socket, &mut envelope, history.clone(), query).await {
            Ok(new_history) => history = new_history,
            Err(e) => {
                warn!(session = %session_id, "turn delivery failed: {}", e);
                break;
            }
        }
    }

    info!(session = %session_id, "session closed");
    if let Some(tx) = shutdown_tx {
        let _ = tx.send(());
    }
}

/// Runs one turn, streaming events to the socket. Returns the updated history.
async fn run_turn(
    engine: &Arc<Engine>,
    socket: &mut WebSocket,
    envelope: &mut EnvelopeState,
    history: Vec<switchboard::Message>,
    query: String,
) -> Result<Vec<switchboard::Message>, Box<dyn std::error::Error + Send + Sync>> {
    let (sink, mut rx) = ProgressSink::channel();
    let engine = Arc::clone(engine);
    let turn = tokio::spawn(async move {
        let state = engine.run_query(history, &query, Some(&sink)).await;
        state
    });

    while let Some(event) = rx.recv().await {
        send_event(socket, &to_protocol(event), envelope).await?;
    }

    let state = turn.await?;
    Ok(state.messages)
}

async fn send_event(
    socket: &mut WebSocket,
    event: &ProtocolEvent,
    envelope: &mut EnvelopeState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let value = to_json(event, envelope)?;
    socket
        .send(WsMessage::Text(serde_json::to_string(&value)?))
        .await?;
    Ok(())
}
