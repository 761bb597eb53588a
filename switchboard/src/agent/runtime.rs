//! The per-agent execution loop: model call → tool calls → repeat.
//!
//! Each loop round invokes the model through the agent's middleware chain,
//! appends the assistant message, and — when it carries tool calls — executes
//! them and appends one Tool message per call. Tool handlers for one round
//! run concurrently, but results are appended in the order of the originating
//! tool-call list, so replaying a conversation is deterministic.
//!
//! Tool failures never abort the loop: they are stringified into the Tool
//! message with an `ERROR:` prefix so the model can retry or apologize. Model
//! failures propagate, except a rate limit, which is retried once with a
//! jittered backoff.
//!
//! Every invocation starts a fresh step counter: a specialist called from a
//! supervisor that already burned S steps still has its full recursion limit.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::llm::{LlmError, ModelClient, ModelRequest, ModelResponse};
use crate::message::{Message, ToolCall};
use crate::middleware::MiddlewareChain;
use crate::progress::{args_preview, ProgressEvent, ProgressSink};
use crate::settings::{ReasoningEffort, Settings};
use crate::tools::{validate_args, Tool};

use super::{AgentOutcome, PreparedAgent, RunError, RunMetadata};

/// Base delay before the single rate-limit retry.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_millis(500);
/// Arguments preview length in progress events.
const ARGS_PREVIEW_LEN: usize = 120;

/// Executes one agent's tool loop.
///
/// One runtime is built per agent per turn (it carries the turn's progress
/// sink); the model client and middleware chain are shared handles.
pub struct AgentRuntime {
    client: Arc<dyn ModelClient>,
    chain: MiddlewareChain,
    model: String,
    temperature: f64,
    reasoning_effort: ReasoningEffort,
    llm_timeout: Duration,
    recursion_limit: usize,
    progress: Option<ProgressSink>,
}

impl AgentRuntime {
    pub fn new(client: Arc<dyn ModelClient>, chain: MiddlewareChain, settings: &Settings) -> Self {
        Self {
            client,
            chain,
            model: settings.llm_model.clone(),
            temperature: settings.llm_temperature,
            reasoning_effort: settings.llm_reasoning_effort,
            llm_timeout: settings.llm_request_timeout(),
            recursion_limit: settings.recursion_limit,
            progress: None,
        }
    }

    /// Per-agent override (e.g. from the agent's extras subtree).
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Runs the loop to completion (no outer deadline; callers add their own).
    pub async fn run(
        &self,
        prepared: &PreparedAgent,
        query: &str,
        history: &[Message],
    ) -> Result<AgentOutcome, RunError> {
        let tools_used = Arc::new(Mutex::new(Vec::new()));
        self.run_inner(prepared, query, history, &tools_used, CancellationToken::new())
            .await
    }

    /// Runs the loop under `timeout`. On expiry the in-flight work is
    /// cancelled and a truncated outcome with `metadata.timed_out` is
    /// returned — not an error, so an agent running as a tool yields a string
    /// its parent model can recover from.
    pub async fn run_with_timeout(
        &self,
        prepared: &PreparedAgent,
        query: &str,
        history: &[Message],
        timeout: Duration,
    ) -> Result<AgentOutcome, RunError> {
        let tools_used = Arc::new(Mutex::new(Vec::new()));
        let cancel = CancellationToken::new();
        let run = self.run_inner(prepared, query, history, &tools_used, cancel.clone());
        match tokio::time::timeout(timeout, run).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                let used = tools_used.lock().expect("tools_used poisoned").clone();
                warn!(
                    agent = %prepared.name,
                    timeout_secs = timeout.as_secs_f64(),
                    "agent invocation timed out"
                );
                Ok(AgentOutcome {
                    response: format!(
                        "The {} agent timed out after {} seconds; partial work was discarded.",
                        prepared.name,
                        timeout.as_secs_f64()
                    ),
                    agent_name: prepared.name.clone(),
                    tools_used: used.clone(),
                    metadata: RunMetadata {
                        steps: used.len(),
                        timed_out: true,
                    },
                })
            }
        }
    }

    async fn run_inner(
        &self,
        prepared: &PreparedAgent,
        query: &str,
        history: &[Message],
        tools_used: &Arc<Mutex<Vec<String>>>,
        cancel: CancellationToken,
    ) -> Result<AgentOutcome, RunError> {
        if let Some(ref sink) = self.progress {
            sink.progress(&prepared.name, "processing").await;
        }

        let specs = prepared.tool_specs();
        let mut messages: Vec<Message> = history.to_vec();
        messages.push(Message::user(query));
        let mut steps = 0usize;

        loop {
            let mut request = ModelRequest::new(self.model.clone(), messages.clone());
            request.system = Some(prepared.system_prompt.clone());
            request.tools = specs.clone();
            request.temperature = self.temperature;
            request.reasoning_effort = self.reasoning_effort;
            request.timeout = self.llm_timeout;
            request.cancel = cancel.child_token();

            let response = self.invoke_with_retry(request).await?;
            let tool_calls = response.tool_calls.clone();
            messages.push(response.into_message());

            if tool_calls.is_empty() {
                let content = messages
                    .last()
                    .map(Message::text)
                    .unwrap_or_default();
                return Ok(AgentOutcome {
                    response: content,
                    agent_name: prepared.name.clone(),
                    tools_used: tools_used.lock().expect("tools_used poisoned").clone(),
                    metadata: RunMetadata {
                        steps,
                        timed_out: false,
                    },
                });
            }

            steps += 1;
            if steps > self.recursion_limit {
                return Err(RunError::RecursionExceeded {
                    agent: prepared.name.clone(),
                    limit: self.recursion_limit,
                });
            }

            debug!(
                agent = %prepared.name,
                step = steps,
                calls = tool_calls.len(),
                "executing tool calls"
            );
            // Handlers run concurrently; results are appended in call order.
            let results = join_all(
                tool_calls
                    .iter()
                    .map(|call| self.execute_tool(prepared, call, tools_used)),
            )
            .await;
            for (call, result) in tool_calls.iter().zip(results) {
                messages.push(Message::tool(&call.id, result));
            }
        }
    }

    async fn invoke_with_retry(&self, request: ModelRequest) -> Result<ModelResponse, LlmError> {
        match self.chain.run(self.client.as_ref(), request.clone()).await {
            Err(LlmError::RateLimit) => {
                let backoff = RATE_LIMIT_BACKOFF + jitter();
                warn!(backoff_ms = backoff.as_millis() as u64, "rate limited; retrying once");
                tokio::time::sleep(backoff).await;
                self.chain.run(self.client.as_ref(), request).await
            }
            other => other,
        }
    }

    async fn execute_tool(
        &self,
        prepared: &PreparedAgent,
        call: &ToolCall,
        tools_used: &Arc<Mutex<Vec<String>>>,
    ) -> String {
        tools_used
            .lock()
            .expect("tools_used poisoned")
            .push(call.name.clone());
        if let Some(ref sink) = self.progress {
            sink.send(ProgressEvent::ToolCallStarted {
                agent: prepared.name.clone(),
                tool: call.name.clone(),
                args_preview: args_preview(&call.arguments, ARGS_PREVIEW_LEN),
            })
            .await;
        }

        let result = match prepared.tools.iter().find(|t| t.name() == call.name) {
            None => Err(crate::tools::ToolError::InvalidInput(format!(
                "unknown tool: {}",
                call.name
            ))),
            Some(tool) => run_one_tool(tool.as_ref(), call).await,
        };

        let (ok, text) = match result {
            Ok(text) => (true, text),
            Err(e) => (false, format!("ERROR: {}", e)),
        };
        if let Some(ref sink) = self.progress {
            sink.send(ProgressEvent::ToolCallFinished {
                agent: prepared.name.clone(),
                tool: call.name.clone(),
                ok,
            })
            .await;
        }
        text
    }
}

async fn run_one_tool(
    tool: &dyn Tool,
    call: &ToolCall,
) -> Result<String, crate::tools::ToolError> {
    validate_args(&tool.spec().input_schema, &call.arguments)?;
    tool.call(call.arguments.clone()).await
}

/// Sub-second jitter derived from the wall clock; good enough to de-align
/// retries without a PRNG dependency.
fn jitter() -> Duration {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    Duration::from_millis(u64::from(nanos % 250_000_000) / 1_000_000)
}
