//! Tools: named, schema-described capabilities the model can invoke.
//!
//! A [`Tool`] has a unique name, a [`ToolSpec`] (description + JSON schema for
//! its arguments), and async call logic returning a string result. Tool
//! failures are recoverable by design: the agent runtime stringifies
//! [`ToolError`]s into the Tool message so the model can retry or apologize.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Specification of one tool: what the model sees in its tool list.
#[derive(Clone, Debug)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema for the arguments object.
    pub input_schema: Value,
}

/// Errors a tool call can fail with. All of them end up as a stringified
/// `ERROR: …` tool result unless the runtime has a stricter policy.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    Execution(String),
    #[error("path escapes the knowledge root: {0}")]
    PathTraversal(String),
    #[error("URL not allowed by security policy: {0}")]
    UrlBlocked(String),
}

/// A single invocable capability.
///
/// **Interaction**: registered on an [`Agent`](crate::agent::Agent); specs are
/// serialized into the model request by the model client; calls are dispatched
/// by the agent runtime after argument validation. Handlers for calls issued
/// in one assistant turn may run concurrently and must not share mutable
/// state.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name within one agent's tool set.
    fn name(&self) -> &str;

    /// Description and argument schema shown to the model.
    fn spec(&self) -> ToolSpec;

    /// Executes the tool. `args` has already passed schema validation.
    async fn call(&self, args: Value) -> Result<String, ToolError>;
}

/// Validates `args` against the top level of a tool's JSON schema: every
/// `required` property must be present, and present properties with a declared
/// primitive `type` must match it. Nested object schemas are not descended
/// into; tools validate their own interiors.
pub fn validate_args(schema: &Value, args: &Value) -> Result<(), ToolError> {
    let Some(obj) = args.as_object() else {
        return Err(ToolError::InvalidInput(
            "arguments must be a JSON object".to_string(),
        ));
    };
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !obj.contains_key(name) {
                return Err(ToolError::InvalidInput(format!(
                    "missing required argument: {}",
                    name
                )));
            }
        }
    }
    if let Some(props) = schema.get("properties").and_then(Value::as_object) {
        for (name, prop) in props {
            let Some(value) = obj.get(name) else { continue };
            let Some(expected) = prop.get("type").and_then(Value::as_str) else {
                continue;
            };
            let ok = match expected {
                "string" => value.is_string(),
                "number" => value.is_number(),
                "integer" => value.is_i64() || value.is_u64(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                _ => true,
            };
            if !ok {
                return Err(ToolError::InvalidInput(format!(
                    "argument {} should be of type {}",
                    name, expected
                )));
            }
        }
    }
    Ok(())
}

/// A tool built from a name, spec pieces, and an async closure.
///
/// Tool authors construct one of these per capability and hand the list to
/// the agent; no trait impl needed for simple function-shaped tools.
pub struct FunctionTool {
    name: String,
    description: String,
    input_schema: Value,
    handler: Box<
        dyn Fn(Value) -> futures::future::BoxFuture<'static, Result<String, ToolError>>
            + Send
            + Sync,
    >,
}

impl FunctionTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Box::new(move |args| Box::pin(handler(args))),
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        (self.handler)(args).await
    }
}
