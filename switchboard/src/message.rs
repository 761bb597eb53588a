//! Conversation messages: the value appended to history by every node.
//!
//! A [`Message`] is one of System / User / Assistant / Tool. Content is either a
//! plain string or an ordered list of typed parts (some providers send the
//! latter); use [`MessageContent::as_text`] to flatten. Assistant messages may
//! carry [`ToolCall`]s; Tool messages carry the result for one call id.
//! Messages are immutable once appended — summarization replaces a prefix with
//! a single System message rather than editing in place.

use serde::{Deserialize, Serialize};

/// One tool invocation requested by the model.
///
/// **Interaction**: written by the model client from the provider response,
/// consumed by the agent runtime which executes the named tool and appends a
/// `Message::Tool` with the matching `tool_call_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id; echoed back in the Tool message.
    pub id: String,
    /// Tool name as registered with the agent.
    pub name: String,
    /// Arguments as a JSON value (already parsed from the provider's string form).
    pub arguments: serde_json::Value,
}

/// Message content: a plain string or an ordered list of parts.
///
/// Deserializes from `"hello"` or `[{"type":"text","text":"hello"}, ...]` so
/// both provider shapes are accepted without a decode error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One part of a multi-part message content list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    /// Part type, e.g. "text", "tool_call", "tool_result". Non-text parts are
    /// skipped when flattening to text.
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl MessageContent {
    /// Flattens the content to text: the string variant as-is, or the
    /// concatenation of all `text` fields from the parts.
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// Byte length of the flattened text; used by the summarization trigger.
    pub fn text_len(&self) -> usize {
        match self {
            MessageContent::Text(s) => s.len(),
            MessageContent::Parts(parts) => {
                parts.iter().filter_map(|p| p.text.as_ref()).map(|t| t.len()).sum()
            }
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Text(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Text(s.to_string())
    }
}

/// A conversation message, tagged by role.
///
/// **Interaction**: appended by the agent runtime (assistant + tool results),
/// by the graph executor (final reply), and replaced in prefix form only by
/// the summarization middleware.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: MessageContent,
    },
    User {
        content: MessageContent,
    },
    Assistant {
        content: MessageContent,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<MessageContent>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<MessageContent>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_with_calls(
        content: impl Into<MessageContent>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    /// Flattened text of this message's content.
    pub fn text(&self) -> String {
        match self {
            Message::System { content } | Message::User { content } => content.as_text(),
            Message::Assistant { content, .. } => content.as_text(),
            Message::Tool { content, .. } => content.clone(),
        }
    }

    /// Role tag as sent on the provider wire.
    pub fn role(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::User { .. } => "user",
            Message::Assistant { .. } => "assistant",
            Message::Tool { .. } => "tool",
        }
    }

    /// Approximate content size in bytes (summarization trigger input).
    pub fn content_len(&self) -> usize {
        match self {
            Message::System { content } | Message::User { content } => content.text_len(),
            Message::Assistant { content, tool_calls } => {
                content.text_len()
                    + tool_calls
                        .iter()
                        .map(|c| c.name.len() + c.arguments.to_string().len())
                        .sum::<usize>()
            }
            Message::Tool { content, .. } => content.len(),
        }
    }
}
