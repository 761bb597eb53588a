//! Client → server message shapes.

use serde::Deserialize;

/// One incoming WebSocket message. Turns on one connection share history and
/// run sequentially in arrival order.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ClientRequest {
    /// `{ "type": "query", "text": "..." }`
    Query { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query() {
        let req: ClientRequest = serde_json::from_str(r#"{"type":"query","text":"hi"}"#).unwrap();
        let ClientRequest::Query { text } = req;
        assert_eq!(text, "hi");
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(serde_json::from_str::<ClientRequest>(r#"{"type":"magic"}"#).is_err());
    }
}
