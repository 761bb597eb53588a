//! Progress streaming: engine → client events for one turn.
//!
//! A [`ProgressSink`] is the sending half of a bounded channel scoped to one
//! turn. The agent runtime emits status and tool lifecycle events, the
//! formatter emits tokens, and the graph executor emits the final reply or an
//! error. The receiving half belongs to exactly one client (terminal or
//! WebSocket connection); when the client stalls, `send` blocks and the turn
//! slows down rather than dropping events.

use tokio::sync::mpsc;

/// Default bounded capacity for one turn's event queue.
pub const PROGRESS_QUEUE_CAPACITY: usize = 128;

/// One progress event within a turn.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// Agent/tool status line ("processing", "calling get_weather").
    Progress { source: String, text: String },
    ToolCallStarted {
        agent: String,
        tool: String,
        args_preview: String,
    },
    ToolCallFinished {
        agent: String,
        tool: String,
        ok: bool,
    },
    /// Streamed token of the final reply (when the provider streams).
    Token { text: String },
    /// The formatted reply; last event of a successful turn.
    Final { text: String },
    Error { message: String },
}

/// Sending half of a turn's progress channel. Cheap to clone; all clones feed
/// the same single consumer.
#[derive(Clone)]
pub struct ProgressSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ProgressSink {
    /// Creates a sink and its consumer side with the default capacity.
    pub fn channel() -> (Self, mpsc::Receiver<ProgressEvent>) {
        Self::with_capacity(PROGRESS_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Sends one event, applying backpressure when the queue is full. A
    /// dropped receiver is not an error — the turn keeps running and the
    /// event is discarded.
    pub async fn send(&self, event: ProgressEvent) {
        if self.tx.send(event).await.is_err() {
            tracing::debug!("progress receiver gone; dropping event");
        }
    }

    pub async fn progress(&self, source: impl Into<String>, text: impl Into<String>) {
        self.send(ProgressEvent::Progress {
            source: source.into(),
            text: text.into(),
        })
        .await;
    }
}

/// Shortens tool arguments for display in progress events.
pub fn args_preview(args: &serde_json::Value, max_len: usize) -> String {
    let mut s = args.to_string();
    if s.len() > max_len {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
        s.push('…');
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_arrive_in_send_order() {
        let (sink, mut rx) = ProgressSink::channel();
        sink.progress("weather", "processing").await;
        sink.send(ProgressEvent::Final {
            text: "done".into(),
        })
        .await;
        drop(sink);

        assert!(matches!(
            rx.recv().await,
            Some(ProgressEvent::Progress { ref source, .. }) if source == "weather"
        ));
        assert!(matches!(rx.recv().await, Some(ProgressEvent::Final { .. })));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_after_receiver_dropped_is_silent() {
        let (sink, rx) = ProgressSink::channel();
        drop(rx);
        sink.progress("a", "b").await;
    }

    #[test]
    fn args_preview_truncates_long_arguments() {
        let args = serde_json::json!({"q": "x".repeat(500)});
        let preview = args_preview(&args, 80);
        assert!(preview.chars().count() <= 81);
        assert!(preview.ends_with('…'));
    }
}
