//! Scripted model client for tests: fixed responses, recorded requests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{LlmError, ModelClient, ModelRequest, ModelResponse};
use crate::message::ToolCall;

/// What the mock saw for one call; used to assert on middleware effects.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub system: Option<String>,
    pub message_count: usize,
    pub tool_names: Vec<String>,
    /// Text of the trailing User message, when the request ends with one.
    pub last_user: Option<String>,
}

/// Model client that pops scripted responses in order.
///
/// When the script runs dry the last response repeats (so a conversation can
/// keep going). An optional per-call delay makes timeout paths testable.
pub struct MockLlm {
    script: Mutex<Vec<ModelResponse>>,
    fallback: ModelResponse,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockLlm {
    pub fn new(script: Vec<ModelResponse>) -> Self {
        let fallback = script.last().cloned().unwrap_or_default();
        Self {
            script: Mutex::new(script),
            fallback,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A mock that always answers with plain text and no tool calls.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(vec![ModelResponse {
            content: text.into(),
            ..Default::default()
        }])
    }

    /// First answer requests the given tool calls; the second closes with text.
    pub fn with_tool_round(calls: Vec<ToolCall>, then_text: impl Into<String>) -> Self {
        Self::new(vec![
            ModelResponse {
                content: String::new(),
                tool_calls: calls,
                ..Default::default()
            },
            ModelResponse {
                content: then_text.into(),
                ..Default::default()
            },
        ])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests observed so far, in call order.
    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock lock poisoned").len()
    }
}

#[async_trait]
impl ModelClient for MockLlm {
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let last_user = request.messages.iter().rev().find_map(|m| match m {
            crate::message::Message::User { content } => Some(content.as_text()),
            _ => None,
        });
        self.calls.lock().expect("mock lock poisoned").push(RecordedCall {
            system: request.system.clone(),
            message_count: request.messages.len(),
            tool_names: request.tools.iter().map(|t| t.name.clone()).collect(),
            last_user,
        });
        let mut script = self.script.lock().expect("mock lock poisoned");
        if script.is_empty() {
            Ok(self.fallback.clone())
        } else {
            Ok(script.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[tokio::test]
    async fn script_pops_in_order_then_repeats_last() {
        let mock = MockLlm::new(vec![
            ModelResponse {
                content: "first".into(),
                ..Default::default()
            },
            ModelResponse {
                content: "second".into(),
                ..Default::default()
            },
        ]);
        let request = ModelRequest::new("m", vec![Message::user("q")]);
        assert_eq!(mock.invoke(&request).await.unwrap().content, "first");
        assert_eq!(mock.invoke(&request).await.unwrap().content, "second");
        assert_eq!(mock.invoke(&request).await.unwrap().content, "second");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn records_system_and_tools() {
        let mock = MockLlm::with_text("ok");
        let mut request = ModelRequest::new("m", vec![Message::user("q")]);
        request.system = Some("base prompt".into());
        request.tools.push(crate::tools::ToolSpec {
            name: "read_skill".into(),
            description: "d".into(),
            input_schema: serde_json::json!({}),
        });
        mock.invoke(&request).await.unwrap();
        let recorded = mock.recorded();
        assert_eq!(recorded[0].system.as_deref(), Some("base prompt"));
        assert_eq!(recorded[0].tool_names, vec!["read_skill"]);
    }
}
