//! Turns on one connection run sequentially and share history.

use serde_json::json;

use crate::common::{collect_until, connect, scripted_engine, send_json, text_response, TestServer};

#[tokio::test]
async fn two_turns_share_one_session() {
    let engine = scripted_engine(vec![
        text_response("raw one"),
        text_response("first reply"),
        text_response("raw two"),
        text_response("second reply"),
    ]);
    let server = TestServer::spawn(engine).await;
    let mut client = connect(&server.url).await;

    send_json(&mut client, json!({"type": "query", "text": "one"})).await;
    send_json(&mut client, json!({"type": "query", "text": "two"})).await;

    let first = collect_until(&mut client, &["final", "error"]).await;
    assert_eq!(first.last().unwrap()["text"], "first reply");

    let second = collect_until(&mut client, &["final", "error"]).await;
    assert_eq!(second.last().unwrap()["text"], "second reply");

    // Same session across both turns; ids keep climbing.
    assert_eq!(
        first.last().unwrap()["session_id"],
        second.last().unwrap()["session_id"]
    );
    assert!(
        second.last().unwrap()["event_id"].as_u64().unwrap()
            > first.last().unwrap()["event_id"].as_u64().unwrap()
    );

    drop(client);
    server.shutdown().await;
}
