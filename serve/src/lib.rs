//! WebSocket server for switchboard (axum + ws).
//!
//! One connection is one session: queries on a connection run strictly
//! sequentially, sharing conversation history; separate connections are
//! independent sessions. `GET /` serves the embedded HTML client, `GET /ws`
//! upgrades to the event stream.
//!
//! **Public API**: [`run_serve`], [`run_serve_on_listener`],
//! [`run_serve_with_engine`].

mod app;
mod connection;
mod events;
mod frontend;
mod request;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::info;

use switchboard::{AgentRegistry, ChatCompletions, Engine, Settings};

use app::{router, AppState};

const DEFAULT_WS_ADDR: &str = "127.0.0.1:8080";

/// Builds a default engine from the working directory's configuration and an
/// empty agent registry. Library users embed their own engine via
/// [`run_serve_with_engine`].
pub fn default_engine() -> Result<Engine, Box<dyn std::error::Error + Send + Sync>> {
    let layers = config::Layers::load(None)?;
    let settings = Settings::load(&layers)?;
    let client = Arc::new(ChatCompletions::new(
        settings.llm_base_url.clone(),
        settings.api_key.clone(),
    ));
    let prompts = switchboard::prompts::load_or_default(None);
    let engine = Engine::new(settings, prompts, Arc::new(AgentRegistry::new()), client)?;
    Ok(engine)
}

/// Runs the server on an existing listener (tests bind to `127.0.0.1:0` and
/// pass the listener in). When `once` is true, the server exits after its
/// first connection closes.
pub async fn run_serve_on_listener(
    engine: Arc<Engine>,
    listener: TcpListener,
    once: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    info!("WebSocket server listening on ws://{}/ws", addr);
    if once {
        info!("will exit after first connection closes (once mode)");
    }

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let state = Arc::new(AppState {
        engine,
        shutdown_tx: Arc::new(std::sync::Mutex::new(if once {
            Some(shutdown_tx)
        } else {
            None
        })),
    });
    let app = router(state);

    if once {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await?;
        info!("connection closed, exiting (once mode)");
    } else {
        axum::serve(listener, app).await?;
    }
    Ok(())
}

/// Runs the server with a caller-supplied engine on `addr`
/// (default `127.0.0.1:8080`).
pub async fn run_serve_with_engine(
    engine: Arc<Engine>,
    addr: Option<&str>,
    once: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = addr.unwrap_or(DEFAULT_WS_ADDR);
    let listener = TcpListener::bind(addr).await?;
    run_serve_on_listener(engine, listener, once).await
}

/// Runs the server with the default engine (configuration from the working
/// directory, no registered agents).
pub async fn run_serve(
    addr: Option<&str>,
    once: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let engine = Arc::new(default_engine()?);
    run_serve_with_engine(engine, addr, once).await
}
