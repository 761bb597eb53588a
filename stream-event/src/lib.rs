//! Wire-level event types for streaming turn progress to clients.
//!
//! [`ProtocolEvent`] is the `type` + payload shape serialized onto the
//! WebSocket; [`Envelope`]/[`EnvelopeState`] add `session_id` and a
//! monotonically increasing `event_id` per connection. The engine-side event
//! model lives in the `switchboard` crate; servers convert at the boundary so
//! this crate stays dependency-light.

mod envelope;
mod event;

pub use envelope::{to_json, Envelope, EnvelopeState};
pub use event::ProtocolEvent;
