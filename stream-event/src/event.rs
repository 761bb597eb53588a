//! Protocol event: wire shape for one progress event (type + payload).

use serde::{Deserialize, Serialize};

/// One server → client message during a turn. Envelope fields (session_id,
/// event_id) are injected separately.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    /// Agent/tool status line.
    Progress { source: String, text: String },
    ToolStart {
        agent: String,
        tool: String,
        args_preview: String,
    },
    ToolEnd {
        agent: String,
        tool: String,
        ok: bool,
    },
    /// Streamed token of the final reply.
    Token { text: String },
    /// The formatted reply; terminal event of a successful turn.
    Final { text: String },
    /// Terminal event of a failed turn.
    Error { message: String },
}

impl ProtocolEvent {
    /// Serializes this event to a JSON object (type + payload only).
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
