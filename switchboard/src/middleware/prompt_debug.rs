//! Prompt debugging: log the final request and response around each call.
//!
//! Development-only — tool-call arguments are logged verbatim and may contain
//! credentials. Output goes to the application log (never the user channel)
//! at INFO, truncated per field.

use async_trait::async_trait;
use tracing::{info, warn};

use super::{Middleware, NextCall};
use crate::llm::{LlmError, ModelRequest, ModelResponse};
use crate::message::Message;

pub struct PromptDebug {
    max_field_length: usize,
    show_response: bool,
}

static CREDENTIAL_WARNING: std::sync::Once = std::sync::Once::new();

impl PromptDebug {
    pub fn new(max_field_length: usize, show_response: bool) -> Self {
        CREDENTIAL_WARNING.call_once(|| {
            warn!("prompt debug is on: prompts and tool arguments will be logged verbatim");
        });
        Self {
            max_field_length,
            show_response,
        }
    }

    fn clip<'a>(&self, s: &'a str) -> std::borrow::Cow<'a, str> {
        if s.len() <= self.max_field_length {
            return std::borrow::Cow::Borrowed(s);
        }
        let mut end = self.max_field_length;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        std::borrow::Cow::Owned(format!("{}… [+{} bytes]", &s[..end], s.len() - end))
    }
}

#[async_trait]
impl Middleware for PromptDebug {
    async fn around_model_call(
        &self,
        request: ModelRequest,
        next: NextCall<'_>,
    ) -> Result<ModelResponse, LlmError> {
        info!(
            target: "prompt_debug",
            model = %request.model,
            system = %self.clip(request.system.as_deref().unwrap_or("")),
            "model request"
        );
        for (i, message) in request.messages.iter().enumerate() {
            match message {
                Message::Assistant { tool_calls, .. } if !tool_calls.is_empty() => {
                    for call in tool_calls {
                        info!(
                            target: "prompt_debug",
                            index = i,
                            tool = %call.name,
                            args = %self.clip(&call.arguments.to_string()),
                            "assistant tool call"
                        );
                    }
                }
                _ => {
                    info!(
                        target: "prompt_debug",
                        index = i,
                        role = message.role(),
                        content = %self.clip(&message.text()),
                        "message"
                    );
                }
            }
        }

        let result = next(request).await;

        if self.show_response {
            match &result {
                Ok(response) => info!(
                    target: "prompt_debug",
                    tool_calls = response.tool_calls.len(),
                    content = %self.clip(&response.content),
                    "model response"
                ),
                Err(e) => info!(target: "prompt_debug", error = %e, "model error"),
            }
        }
        result
    }
}
