//! Interactive chat loop: read a line, run a turn, render, repeat.
//!
//! Exits on EOF (Ctrl+D) or `quit`/`exit`/`/quit`. Conversation history
//! carries across turns within the session; a turn error prints and the loop
//! continues.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use cli::Renderer;
use switchboard::{Engine, Message, ProgressSink};

fn is_quit_command(line: &str) -> bool {
    matches!(line.trim(), "quit" | "exit" | "/quit")
}

pub async fn run_chat_loop(engine: &Arc<Engine>) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "{} ready — {} agents registered. Type a question, or `quit` to leave.",
        engine.settings().name,
        engine.registry().len()
    );
    let mut reader = BufReader::new(tokio::io::stdin()).lines();
    let mut history: Vec<Message> = Vec::new();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = match reader.next_line().await? {
            None => break,
            Some(s) if s.trim().is_empty() => continue,
            Some(s) if is_quit_command(&s) => break,
            Some(s) => s,
        };

        let (sink, mut rx) = ProgressSink::channel();
        let turn = {
            let engine = Arc::clone(engine);
            let history = history.clone();
            tokio::spawn(async move { engine.run_query(history, &line, Some(&sink)).await })
        };

        let mut renderer = Renderer::new();
        while let Some(event) = rx.recv().await {
            renderer.render(event);
        }

        match turn.await {
            Ok(state) => history = state.messages,
            Err(e) => eprintln!("error: {}", e),
        }
    }

    println!("Bye.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_commands_are_recognized() {
        assert!(is_quit_command("quit"));
        assert!(is_quit_command("  exit "));
        assert!(is_quit_command("/quit"));
        assert!(!is_quit_command("quite interesting"));
    }
}
