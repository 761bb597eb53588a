//! Axum app: state, router, WebSocket upgrade, and the HTML client route.

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::{Html, Response},
    routing::get,
    Router,
};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use switchboard::Engine;

use super::connection::handle_socket;
use super::frontend::INDEX_HTML;

pub(crate) struct AppState {
    pub(crate) engine: Arc<Engine>,
    /// When set, the first connection to close signals server exit (once mode).
    pub(crate) shutdown_tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

pub(crate) fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let engine = Arc::clone(&state.engine);
    let shutdown_tx = state.shutdown_tx.lock().ok().and_then(|mut g| g.take());
    ws.on_upgrade(move |socket| handle_socket(socket, engine, shutdown_tx))
}
