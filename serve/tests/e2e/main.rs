//! WebSocket end-to-end tests: real server on an ephemeral port, scripted
//! model, tokio-tungstenite client.

mod common;

mod invalid_json;
mod query_roundtrip;
mod sequential_turns;
