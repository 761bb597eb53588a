//! Terminal rendering of progress events.
//!
//! Progress and tool lines print as dim one-liners; tokens stream inline;
//! the final reply prints as plain text. Everything user-facing goes to
//! stdout — application logs are elsewhere.

use std::io::Write;

use switchboard::ProgressEvent;

/// Renders one turn's events to stdout. Tracks whether tokens streamed so the
/// final event doesn't print the reply twice.
#[derive(Default)]
pub struct Renderer {
    streamed: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders one event. Returns the final reply once it arrives.
    pub fn render(&mut self, event: ProgressEvent) -> Option<String> {
        match event {
            ProgressEvent::Progress { source, text } => {
                println!("· {}: {}", source, text);
                None
            }
            ProgressEvent::ToolCallStarted {
                agent,
                tool,
                args_preview,
            } => {
                println!("· {} → {} {}", agent, tool, args_preview);
                None
            }
            ProgressEvent::ToolCallFinished { tool, ok, .. } => {
                println!("· {} {}", tool, if ok { "done" } else { "failed" });
                None
            }
            ProgressEvent::Token { text } => {
                self.streamed = true;
                print!("{}", text);
                let _ = std::io::stdout().flush();
                None
            }
            ProgressEvent::Final { text } => {
                if self.streamed {
                    println!();
                    self.streamed = false;
                } else {
                    println!("{}", text);
                }
                Some(text)
            }
            ProgressEvent::Error { message } => {
                println!("error: {}", message);
                Some(message)
            }
        }
    }
}
