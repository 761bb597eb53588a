//! Model client abstraction: one async call per LLM completion.
//!
//! The [`ModelClient`] trait takes a [`ModelRequest`] (mutable up to the call
//! boundary — middleware edits it) and returns a [`ModelResponse`] with the
//! assistant text and any tool calls. Implementations: [`ChatCompletions`]
//! (OpenAI-compatible HTTP) and [`MockLlm`] (scripted, for tests).
//!
//! # Streaming
//!
//! `invoke_stream` accepts an optional `mpsc::Sender<MessageChunk>`; clients
//! that support token streaming send chunks as they arrive and still return
//! the complete response. The default implementation calls `invoke` and sends
//! the full content as one chunk.

mod chat_completions;
mod mock;
mod wire;

pub use chat_completions::ChatCompletions;
pub use mock::{MockLlm, RecordedCall};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::message::{Message, ToolCall};
use crate::settings::ReasoningEffort;
use crate::tools::ToolSpec;

/// One streamed token (or token group) of assistant output.
#[derive(Clone, Debug)]
pub struct MessageChunk {
    pub content: String,
}

/// Token usage for one completion, when the provider reports it.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Error taxonomy for model calls. The graph executor translates these to
/// user-visible messages; the agent runtime retries `RateLimit` once.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM request timed out")]
    Timeout,
    #[error("LLM rate limit reached")]
    RateLimit,
    #[error("LLM authentication failed: {0}")]
    Auth(String),
    #[error("LLM server error: {0}")]
    Server(String),
    #[error("LLM client error: {0}")]
    Client(String),
}

/// The mutable request flowing through the middleware chain into the client.
#[derive(Clone, Debug)]
pub struct ModelRequest {
    /// System message; middleware appends/prepends blocks here.
    pub system: Option<String>,
    /// Conversation history (no system message).
    pub messages: Vec<Message>,
    /// Tool specs serialized into the provider's function-calling format.
    pub tools: Vec<ToolSpec>,
    pub model: String,
    pub temperature: f64,
    pub reasoning_effort: ReasoningEffort,
    /// Per-call deadline (`llm_request_timeout`).
    pub timeout: Duration,
    /// Cancelled by the enclosing timeout scope; in-flight HTTP requests
    /// observe it and abort.
    pub cancel: CancellationToken,
}

impl ModelRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            system: None,
            messages,
            tools: Vec::new(),
            model: model.into(),
            temperature: 0.2,
            reasoning_effort: ReasoningEffort::default(),
            timeout: Duration::from_secs(30),
            cancel: CancellationToken::new(),
        }
    }

    /// Full message list as sent on the wire: system first when present.
    pub fn wire_messages(&self) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        if let Some(ref system) = self.system {
            out.push(Message::system(system.clone()));
        }
        out.extend(self.messages.iter().cloned());
        out
    }
}

/// A completed model call.
#[derive(Clone, Debug, Default)]
pub struct ModelResponse {
    pub content: String,
    /// Empty means the agent loop ends this round.
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<LlmUsage>,
}

impl ModelResponse {
    /// The assistant message to append to history.
    pub fn into_message(self) -> Message {
        Message::assistant_with_calls(self.content, self.tool_calls)
    }
}

/// LLM client: given a prepared request, returns the assistant turn.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError>;

    /// Streaming variant. When `chunk_tx` is `Some`, implementations send
    /// tokens through the channel as they arrive; the complete response is
    /// still returned at the end.
    async fn invoke_stream(
        &self,
        request: &ModelRequest,
        chunk_tx: Option<mpsc::Sender<MessageChunk>>,
    ) -> Result<ModelResponse, LlmError> {
        let response = self.invoke(request).await?;
        if let Some(tx) = chunk_tx {
            if !response.content.is_empty() {
                let _ = tx
                    .send(MessageChunk {
                        content: response.content.clone(),
                    })
                    .await;
            }
        }
        Ok(response)
    }
}
