//! Malformed client messages produce an error event and keep the session open.

use serde_json::json;

use crate::common::{collect_until, connect, scripted_engine, send_json, text_response, TestServer};
use futures_util::SinkExt;
use tokio_tungstenite::tungstenite::Message as WsMessage;

#[tokio::test]
async fn parse_error_then_session_still_works() {
    let engine = scripted_engine(vec![
        text_response("raw"),
        text_response("still here"),
    ]);
    let server = TestServer::spawn(engine).await;
    let mut client = connect(&server.url).await;

    client
        .send(WsMessage::Text("this is not json".to_string()))
        .await
        .unwrap();
    let events = collect_until(&mut client, &["error"]).await;
    assert!(events
        .last()
        .unwrap()["message"]
        .as_str()
        .unwrap()
        .contains("parse error"));

    // The connection survived; a real query still round-trips.
    send_json(&mut client, json!({"type": "query", "text": "ping"})).await;
    let events = collect_until(&mut client, &["final", "error"]).await;
    assert_eq!(events.last().unwrap()["type"], "final");
    assert_eq!(events.last().unwrap()["text"], "still here");

    drop(client);
    server.shutdown().await;
}
