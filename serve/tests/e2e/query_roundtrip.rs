//! A query flows to the engine and the final reply flows back, enveloped.

use serde_json::json;

use crate::common::{collect_until, connect, scripted_engine, send_json, text_response, TestServer};

#[tokio::test]
async fn query_produces_progress_then_final() {
    let engine = scripted_engine(vec![
        text_response("raw findings"),
        text_response("Hello from the other side."),
    ]);
    let server = TestServer::spawn(engine).await;
    let mut client = connect(&server.url).await;

    send_json(&mut client, json!({"type": "query", "text": "hello"})).await;
    let events = collect_until(&mut client, &["final", "error"]).await;

    let last = events.last().unwrap();
    assert_eq!(last["type"], "final");
    assert_eq!(last["text"], "Hello from the other side.");
    // Progress precedes the final reply.
    assert!(events.iter().any(|e| e["type"] == "progress"));
    // Envelope: stable session, monotonically increasing event ids.
    let session = events[0]["session_id"].as_str().unwrap();
    let mut last_id = 0u64;
    for event in &events {
        assert_eq!(event["session_id"], session);
        let id = event["event_id"].as_u64().unwrap();
        assert!(id > last_id);
        last_id = id;
    }

    drop(client);
    server.shutdown().await;
}
