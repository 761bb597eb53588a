//! OpenAI-compatible chat-completions client over reqwest.
//!
//! One POST per call, bounded by the request's `timeout` and cancelled through
//! its token — the enclosing specialist/supervisor timeout cancels the HTTP
//! request rather than letting it run to the transport limit.

use async_trait::async_trait;
use tracing::debug;

use super::wire;
use super::{LlmError, ModelClient, ModelRequest, ModelResponse};

/// HTTP client for `/chat/completions` on an OpenAI-compatible base URL.
pub struct ChatCompletions {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ChatCompletions {
    /// `base_url` like `https://api.openai.com/v1` (no trailing slash needed).
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        let body = wire::build_body(request);
        let mut builder = self.http.post(self.endpoint()).json(&body);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::Server(format!("transport: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(map_status(status, detail));
        }
        let parsed: wire::ChatResponseBody = response
            .json()
            .await
            .map_err(|e| LlmError::Server(format!("decode response: {e}")))?;
        Ok(wire::into_response(parsed))
    }
}

fn map_status(status: reqwest::StatusCode, detail: String) -> LlmError {
    match status.as_u16() {
        401 | 403 => LlmError::Auth(detail),
        429 => LlmError::RateLimit,
        500..=599 => LlmError::Server(format!("{status}: {detail}")),
        _ => LlmError::Client(format!("{status}: {detail}")),
    }
}

#[async_trait]
impl ModelClient for ChatCompletions {
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "chat completion request"
        );
        tokio::select! {
            result = tokio::time::timeout(request.timeout, self.send(request)) => {
                match result {
                    Ok(inner) => inner,
                    Err(_) => Err(LlmError::Timeout),
                }
            }
            _ = request.cancel.cancelled() => Err(LlmError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_handles_trailing_slash() {
        let a = ChatCompletions::new("https://api.example.com/v1", None);
        let b = ChatCompletions::new("https://api.example.com/v1/", None);
        assert_eq!(a.endpoint(), "https://api.example.com/v1/chat/completions");
        assert_eq!(a.endpoint(), b.endpoint());
    }

    #[test]
    fn status_mapping_covers_taxonomy() {
        assert!(matches!(
            map_status(reqwest::StatusCode::UNAUTHORIZED, String::new()),
            LlmError::Auth(_)
        ));
        assert!(matches!(
            map_status(reqwest::StatusCode::TOO_MANY_REQUESTS, String::new()),
            LlmError::RateLimit
        ));
        assert!(matches!(
            map_status(reqwest::StatusCode::BAD_GATEWAY, String::new()),
            LlmError::Server(_)
        ));
        assert!(matches!(
            map_status(reqwest::StatusCode::BAD_REQUEST, String::new()),
            LlmError::Client(_)
        ));
    }
}
