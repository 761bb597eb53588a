//! Engine event → wire event conversion.

use stream_event::ProtocolEvent;
use switchboard::ProgressEvent;

pub(crate) fn to_protocol(event: ProgressEvent) -> ProtocolEvent {
    match event {
        ProgressEvent::Progress { source, text } => ProtocolEvent::Progress { source, text },
        ProgressEvent::ToolCallStarted {
            agent,
            tool,
            args_preview,
        } => ProtocolEvent::ToolStart {
            agent,
            tool,
            args_preview,
        },
        ProgressEvent::ToolCallFinished { agent, tool, ok } => {
            ProtocolEvent::ToolEnd { agent, tool, ok }
        }
        ProgressEvent::Token { text } => ProtocolEvent::Token { text },
        ProgressEvent::Final { text } => ProtocolEvent::Final { text },
        ProgressEvent::Error { message } => ProtocolEvent::Error { message },
    }
}
