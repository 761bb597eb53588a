//! Envelope: session_id + event_id stamped onto each outgoing event.

use serde_json::Value;

use crate::event::ProtocolEvent;

/// Envelope fields attached to each message. Never overwrites keys already
/// present on the event payload.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    /// Constant within one connection's session.
    pub session_id: Option<String>,
    /// Monotonically increasing within a session.
    pub event_id: Option<u64>,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn with_event_id(mut self, id: u64) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Merges envelope fields into the JSON object (top level only).
    pub fn inject_into(&self, obj: &mut Value) {
        let Some(obj) = obj.as_object_mut() else {
            return;
        };
        if let Some(ref id) = self.session_id {
            obj.entry("session_id")
                .or_insert_with(|| Value::String(id.clone()));
        }
        if let Some(id) = self.event_id {
            obj.entry("event_id")
                .or_insert_with(|| Value::Number(serde_json::Number::from(id)));
        }
    }
}

/// Per-session envelope state: stable session id, advancing event id.
pub struct EnvelopeState {
    pub session_id: String,
    pub next_event_id: u64,
}

impl EnvelopeState {
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            next_event_id: 1,
        }
    }

    /// Stamps the value and advances the counter.
    pub fn inject_into(&mut self, value: &mut Value) {
        let envelope = Envelope::new()
            .with_session_id(&self.session_id)
            .with_event_id(self.next_event_id);
        self.next_event_id += 1;
        envelope.inject_into(value);
    }
}

/// Converts an event to JSON and stamps the envelope.
pub fn to_json(
    event: &ProtocolEvent,
    state: &mut EnvelopeState,
) -> Result<Value, serde_json::Error> {
    let mut value = event.to_value()?;
    state.inject_into(&mut value);
    Ok(value)
}
