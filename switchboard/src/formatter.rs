//! The formatter: one model call, no tools, that turns the supervisor's raw
//! findings into the user-facing reply.
//!
//! The prompt is four composable sections — CORE (synthesis behavior, rarely
//! customized), TONE, FORMAT, EXTRA — overridable per section through the
//! builder. Only the *formatted* reply ever reaches the persistent history;
//! the raw findings are dropped after this call so future turns never see the
//! same content twice. The trade-off is accepted: details the formatter
//! drops must be re-fetched by the supervisor on follow-ups.
//!
//! On timeout or model failure the raw findings are returned verbatim —
//! a rough answer beats none.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use crate::llm::{MessageChunk, ModelClient, ModelRequest};
use crate::message::Message;
use crate::middleware::MiddlewareChain;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::prompts::EnginePrompts;
use crate::settings::Settings;

/// Composable prompt sections for the formatter.
#[derive(Clone, Debug, Default)]
pub struct FormatterBuilder {
    core: String,
    tone: String,
    format: String,
    extra: String,
}

impl FormatterBuilder {
    pub fn from_prompts(prompts: &EnginePrompts) -> Self {
        Self {
            core: prompts.formatter_core().to_string(),
            tone: prompts.formatter_tone().to_string(),
            format: prompts.formatter_format().to_string(),
            extra: prompts.formatter_extra().to_string(),
        }
    }

    pub fn with_core(mut self, core: impl Into<String>) -> Self {
        self.core = core.into();
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }

    /// Joins the non-empty sections into the formatter system prompt.
    pub fn prompt(&self) -> String {
        [&self.core, &self.tone, &self.format, &self.extra]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn build(
        self,
        client: Arc<dyn ModelClient>,
        chain: MiddlewareChain,
        settings: &Settings,
    ) -> Formatter {
        Formatter {
            client,
            chain,
            prompt: self.prompt(),
            model: settings.llm_model.clone(),
            temperature: settings.llm_temperature,
            llm_timeout: settings.llm_request_timeout(),
            timeout: settings.formatter_timeout(),
        }
    }
}

/// The formatter node's executable form.
pub struct Formatter {
    client: Arc<dyn ModelClient>,
    chain: MiddlewareChain,
    prompt: String,
    model: String,
    temperature: f64,
    llm_timeout: Duration,
    timeout: Duration,
}

impl Formatter {
    /// Formats `agent_results` into the final reply. Streams tokens into the
    /// sink when the provider supports it; falls back to the raw findings on
    /// timeout or failure.
    pub async fn format(
        &self,
        user_query: &str,
        agent_results: &str,
        history: &[Message],
        sink: Option<&ProgressSink>,
    ) -> String {
        let mut messages = history.to_vec();
        messages.push(Message::user(format!(
            "User query:\n{}\n\nAgent findings:\n{}\n\nWrite the final reply to the user.",
            user_query, agent_results
        )));

        let mut request = ModelRequest::new(self.model.clone(), messages);
        request.system = Some(self.prompt.clone());
        request.temperature = self.temperature;
        request.timeout = self.llm_timeout;

        let (chunk_tx, forward) = match sink {
            Some(sink) => {
                let (tx, rx) = mpsc::channel::<MessageChunk>(64);
                (Some(tx), Some((sink.clone(), rx)))
            }
            None => (None, None),
        };
        let forward_task = async {
            if let Some((sink, mut rx)) = forward {
                while let Some(chunk) = rx.recv().await {
                    sink.send(ProgressEvent::Token {
                        text: chunk.content,
                    })
                    .await;
                }
            }
        };

        let call = self.chain.run_stream(self.client.as_ref(), request, chunk_tx);
        let (result, ()) = tokio::join!(tokio::time::timeout(self.timeout, call), forward_task);

        match result {
            Ok(Ok(response)) if !response.content.is_empty() => response.content,
            Ok(Ok(_)) => {
                warn!("formatter returned empty content; falling back to raw findings");
                agent_results.to_string()
            }
            Ok(Err(e)) => {
                warn!("formatter call failed, returning raw findings: {}", e);
                agent_results.to_string()
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.timeout.as_secs_f64(),
                    "formatter timed out, returning raw findings"
                );
                agent_results.to_string()
            }
        }
    }
}
