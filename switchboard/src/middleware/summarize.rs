//! History compression: replace an old message prefix with one synopsis.
//!
//! Triggers when the estimated token count of the request messages passes the
//! configured threshold. The estimate is bytes/4 — no provider tokenizer
//! dependency, so the number is approximate and the threshold should be read
//! as such. The last K messages stay verbatim; everything before them is
//! condensed by a second, short model call into a single System message.
//!
//! The synopsis carries [`SUMMARY_MARKER`] so a later pass summarizes the
//! summary together with newer messages instead of stacking synopses.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{Middleware, NextCall};
use crate::llm::{LlmError, ModelClient, ModelRequest, ModelResponse};
use crate::message::Message;

/// First line of every synopsis message.
pub const SUMMARY_MARKER: &str = "[conversation summary]";

pub struct Summarization {
    client: Arc<dyn ModelClient>,
    prompt: String,
    trigger_tokens: u32,
    keep_messages: usize,
}

impl Summarization {
    pub fn new(
        client: Arc<dyn ModelClient>,
        prompt: String,
        trigger_tokens: u32,
        keep_messages: usize,
    ) -> Self {
        Self {
            client,
            prompt,
            trigger_tokens,
            keep_messages,
        }
    }

    /// Approximate token count: total content bytes / 4.
    fn estimate_tokens(messages: &[Message]) -> u32 {
        let bytes: usize = messages.iter().map(Message::content_len).sum();
        (bytes / 4) as u32
    }

    async fn summarize_prefix(
        &self,
        request: &ModelRequest,
        prefix: &[Message],
    ) -> Result<String, LlmError> {
        let mut transcript = String::new();
        for message in prefix {
            transcript.push_str(&format!("{}: {}\n", message.role(), message.text()));
        }
        let mut call = ModelRequest::new(request.model.clone(), vec![Message::user(transcript)]);
        call.system = Some(self.prompt.clone());
        call.temperature = 0.0;
        call.timeout = request.timeout;
        call.cancel = request.cancel.clone();
        let response = self.client.invoke(&call).await?;
        Ok(response.content)
    }
}

#[async_trait]
impl Middleware for Summarization {
    async fn around_model_call(
        &self,
        mut request: ModelRequest,
        next: NextCall<'_>,
    ) -> Result<ModelResponse, LlmError> {
        let estimate = Self::estimate_tokens(&request.messages);
        let cut = request.messages.len().saturating_sub(self.keep_messages);
        if estimate <= self.trigger_tokens || cut == 0 {
            return next(request).await;
        }

        debug!(
            estimate,
            trigger = self.trigger_tokens,
            compressing = cut,
            keeping = self.keep_messages,
            "summarizing conversation prefix"
        );
        let prefix: Vec<Message> = request.messages[..cut].to_vec();
        match self.summarize_prefix(&request, &prefix).await {
            Ok(synopsis) => {
                let summary =
                    Message::system(format!("{}\n{}", SUMMARY_MARKER, synopsis.trim()));
                let kept = request.messages.split_off(cut);
                request.messages = std::iter::once(summary).chain(kept).collect();
            }
            Err(e) => {
                // A failed compression call must not fail the turn.
                warn!("summarization call failed, continuing uncompressed: {}", e);
            }
        }
        next(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;

    fn long_conversation(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("question {} {}", i, "x".repeat(400)))
                } else {
                    Message::assistant(format!("answer {} {}", i, "y".repeat(400)))
                }
            })
            .collect()
    }

    fn middleware(trigger: u32, keep: usize) -> (Summarization, Arc<MockLlm>) {
        let summarizer = Arc::new(MockLlm::with_text("people discussed many things"));
        let mw = Summarization::new(
            summarizer.clone(),
            "summarize".to_string(),
            trigger,
            keep,
        );
        (mw, summarizer)
    }

    /// **Scenario**: past the threshold, the prefix collapses into exactly one
    /// marked System message followed by the last K messages verbatim.
    #[tokio::test]
    async fn prefix_becomes_single_marked_summary() {
        let (mw, summarizer) = middleware(100, 4);
        let messages = long_conversation(12);
        let tail: Vec<Message> = messages[8..].to_vec();

        let next_seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = next_seen.clone();
        mw.around_model_call(
            ModelRequest::new("m", messages),
            Box::new(move |r| {
                seen.lock().unwrap().extend(r.messages.clone());
                Box::pin(async { Ok(ModelResponse::default()) })
            }),
        )
        .await
        .unwrap();

        let seen = next_seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        assert!(seen[0].text().starts_with(SUMMARY_MARKER));
        assert!(seen[0].text().contains("people discussed many things"));
        assert_eq!(seen[1..], tail[..]);
        assert_eq!(summarizer.call_count(), 1);
    }

    /// **Scenario**: below the threshold nothing changes.
    #[tokio::test]
    async fn below_threshold_is_untouched() {
        let (mw, summarizer) = middleware(1_000_000, 4);
        let final_llm = MockLlm::with_text("ok");
        let chain = super::super::MiddlewareChain::new(vec![Arc::new(mw)]);
        let request = ModelRequest::new("m", long_conversation(12));
        chain.run(&final_llm, request).await.unwrap();
        assert_eq!(final_llm.recorded()[0].message_count, 12);
        assert_eq!(summarizer.call_count(), 0);
    }

    /// **Scenario**: keep_messages = 0 summarizes the entire history into the
    /// one synopsis message.
    #[tokio::test]
    async fn keep_zero_compresses_everything() {
        let (mw, _) = middleware(100, 0);
        let final_llm = MockLlm::with_text("ok");
        let chain = super::super::MiddlewareChain::new(vec![Arc::new(mw)]);
        let request = ModelRequest::new("m", long_conversation(8));
        chain.run(&final_llm, request).await.unwrap();
        assert_eq!(final_llm.recorded()[0].message_count, 1);
    }

    /// **Scenario**: a failing summarizer leaves the request unchanged rather
    /// than failing the turn.
    #[tokio::test]
    async fn summarizer_failure_is_non_fatal() {
        struct FailingClient;
        #[async_trait]
        impl ModelClient for FailingClient {
            async fn invoke(&self, _r: &ModelRequest) -> Result<ModelResponse, LlmError> {
                Err(LlmError::Server("boom".into()))
            }
        }
        let mw = Summarization::new(Arc::new(FailingClient), "p".into(), 100, 2);
        let final_llm = MockLlm::with_text("ok");
        let chain = super::super::MiddlewareChain::new(vec![Arc::new(mw)]);
        let request = ModelRequest::new("m", long_conversation(10));
        let response = chain.run(&final_llm, request).await.unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(final_llm.recorded()[0].message_count, 10);
    }
}
