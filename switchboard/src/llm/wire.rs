//! Chat-completions wire DTOs (OpenAI-compatible).
//!
//! Field names match the provider's JSON. Request content is always sent as a
//! plain string (multi-part history is flattened); responses accept both the
//! string and null content forms.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::{LlmUsage, ModelRequest, ModelResponse};
use crate::message::{Message, ToolCall};

#[derive(Debug, Serialize)]
pub struct ChatRequestBody {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub function: WireFunction,
}

#[derive(Debug, Serialize)]
pub struct WireFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: WireToolCallFunction,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireToolCallFunction {
    pub name: String,
    /// Arguments as a JSON-encoded string (the provider's format).
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponseBody {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<LlmUsage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: WireMessage,
}

/// Builds the request body from a prepared [`ModelRequest`].
pub fn build_body(request: &ModelRequest) -> ChatRequestBody {
    let messages = request.wire_messages().iter().map(to_wire).collect();
    let tools = request
        .tools
        .iter()
        .map(|spec| WireTool {
            tool_type: "function",
            function: WireFunction {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.input_schema.clone(),
            },
        })
        .collect();
    ChatRequestBody {
        model: request.model.clone(),
        messages,
        tools,
        temperature: request.temperature,
        reasoning_effort: Some(request.reasoning_effort.as_str().to_string()),
    }
}

fn to_wire(message: &Message) -> WireMessage {
    match message {
        Message::Tool {
            tool_call_id,
            content,
        } => WireMessage {
            role: "tool".to_string(),
            content: Some(content.clone()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.clone()),
        },
        Message::Assistant {
            content,
            tool_calls,
        } => WireMessage {
            role: "assistant".to_string(),
            content: Some(content.as_text()),
            tool_calls: tool_calls
                .iter()
                .map(|c| WireToolCall {
                    id: c.id.clone(),
                    call_type: "function".to_string(),
                    function: WireToolCallFunction {
                        name: c.name.clone(),
                        arguments: c.arguments.to_string(),
                    },
                })
                .collect(),
            tool_call_id: None,
        },
        other => WireMessage {
            role: other.role().to_string(),
            content: Some(other.text()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        },
    }
}

/// Extracts a [`ModelResponse`] from the first choice of a response body.
/// Tool-call arguments are parsed from the provider's string form; malformed
/// argument JSON degrades to a string value so the tool can report it.
pub fn into_response(body: ChatResponseBody) -> ModelResponse {
    let Some(choice) = body.choices.into_iter().next() else {
        return ModelResponse::default();
    };
    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|c| ToolCall {
            id: c.id,
            name: c.function.name,
            arguments: serde_json::from_str(&c.function.arguments)
                .unwrap_or(Value::String(c.function.arguments)),
        })
        .collect();
    ModelResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        usage: body.usage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn body_serializes_tools_in_function_format() {
        let mut request = ModelRequest::new("test-model", vec![Message::user("hi")]);
        request.tools.push(crate::tools::ToolSpec {
            name: "get_weather".to_string(),
            description: "weather".to_string(),
            input_schema: serde_json::json!({"type": "object"}),
        });
        let body = build_body(&request);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "get_weather");
        assert_eq!(json["reasoning_effort"], "medium");
    }

    #[test]
    fn response_parses_tool_call_arguments() {
        let body: ChatResponseBody = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":null,
               "tool_calls":[{"id":"c1","type":"function",
               "function":{"name":"get_weather","arguments":"{\"city\":\"Tokyo\"}"}}]}}],
               "usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#,
        )
        .unwrap();
        let response = into_response(body);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "get_weather");
        assert_eq!(response.tool_calls[0].arguments["city"], "Tokyo");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn malformed_arguments_degrade_to_string() {
        let body: ChatResponseBody = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"",
               "tool_calls":[{"id":"c1","function":{"name":"t","arguments":"not json"}}]}}]}"#,
        )
        .unwrap();
        let response = into_response(body);
        assert_eq!(
            response.tool_calls[0].arguments,
            Value::String("not json".to_string())
        );
    }

    #[test]
    fn tool_message_carries_call_id() {
        let wire = to_wire(&Message::tool("c9", "done"));
        assert_eq!(wire.role, "tool");
        assert_eq!(wire.tool_call_id.as_deref(), Some("c9"));
    }
}
