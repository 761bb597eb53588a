//! A specialist agent exposed as a tool the supervisor can call.
//!
//! The wrapper description is intentionally generic: routing is driven by the
//! capabilities section of the supervisor prompt, not by per-tool docstrings,
//! so the same text never lives in two places.
//!
//! Failure policy at this boundary (the parent model sees a string it can
//! recover from):
//! - timeout → "timed out" text from the truncated outcome
//! - recursion exceeded → "needed too many steps" text
//! - model errors → [`ToolError::Execution`], stringified by the parent's
//!   runtime into an `ERROR:` tool result

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use crate::tools::{Tool, ToolError, ToolSpec};

use super::{AgentRuntime, PreparedAgent, RunError};

pub struct SpecialistTool {
    prepared: Arc<PreparedAgent>,
    runtime: Arc<AgentRuntime>,
    timeout: Duration,
}

impl SpecialistTool {
    /// `prepared` carries the specialist's system prompt
    /// (capabilities ⊕ planning block) and tools; `runtime` carries its
    /// middleware chain and recursion limit; `timeout` is the specialist
    /// bound, independent of the caller's remaining budget.
    pub fn new(prepared: Arc<PreparedAgent>, runtime: Arc<AgentRuntime>, timeout: Duration) -> Self {
        Self {
            prepared,
            runtime,
            timeout,
        }
    }
}

#[async_trait]
impl Tool for SpecialistTool {
    fn name(&self) -> &str {
        &self.prepared.name
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.prepared.name.clone(),
            description: format!(
                "Invoke the {} specialist agent for queries about its domain.",
                self.prepared.name
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The question or task for this specialist. Provide full context; the specialist has no memory of the conversation."
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidInput("missing required argument: query".into()))?;

        // Fresh history and a fresh step counter: nothing of the caller's
        // budget or conversation leaks into the specialist.
        match self
            .runtime
            .run_with_timeout(&self.prepared, query, &[], self.timeout)
            .await
        {
            Ok(outcome) => Ok(outcome.response),
            Err(RunError::RecursionExceeded { agent, limit }) => {
                warn!(agent = %agent, limit, "specialist exceeded its step limit");
                Ok(format!(
                    "The {} agent needed too many steps (limit {}) and stopped; try a narrower request.",
                    agent, limit
                ))
            }
            Err(RunError::Llm(e)) => Err(ToolError::Execution(format!(
                "{} agent failed: {}",
                self.prepared.name, e
            ))),
        }
    }
}
