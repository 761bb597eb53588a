//! Graph executor: runs supervisor → formatter with the timeout hierarchy.
//!
//! The supervisor node is bounded by `supervisor_timeout`; everything nested
//! (specialists, their tools, every LLM call) runs inside that bound. The
//! formatter has its own independent bound and falls back to the raw findings
//! internally, so formatter trouble never fails a turn. Supervisor failures
//! abort the turn: the state moves to `Error` and the user sees a translated
//! message while the full detail goes to the log.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, info};

use crate::agent::{AgentRuntime, PreparedAgent, RunError};
use crate::formatter::Formatter;
use crate::llm::LlmError;
use crate::message::Message;
use crate::progress::{ProgressEvent, ProgressSink};

use super::{ChatbotState, Next, Node, WorkflowStep};

/// Turn-level failure, before translation to a user-visible message.
#[derive(Error, Debug)]
pub enum TurnError {
    #[error("supervisor timed out after {0:.0} seconds")]
    SupervisorTimeout(f64),
    #[error(transparent)]
    Run(#[from] RunError),
}

impl TurnError {
    /// The fixed user-visible message for this failure. Full detail is logged
    /// separately; the user channel gets one stable sentence.
    pub fn user_message(&self) -> &'static str {
        match self {
            TurnError::SupervisorTimeout(_) | TurnError::Run(RunError::Llm(LlmError::Timeout)) => {
                "The request took too long; try a narrower query."
            }
            TurnError::Run(RunError::Llm(LlmError::RateLimit)) => {
                "API rate limit reached; please retry in a moment."
            }
            TurnError::Run(RunError::RecursionExceeded { .. }) => {
                "The request required too many steps; please simplify."
            }
            TurnError::Run(RunError::Llm(_)) => {
                "An error occurred while processing your request."
            }
        }
    }
}

/// The supervisor step: run the routing agent, capture its raw output.
pub struct SupervisorNode {
    pub prepared: PreparedAgent,
    pub runtime: AgentRuntime,
    pub timeout: Duration,
}

#[async_trait::async_trait]
impl Node<ChatbotState> for SupervisorNode {
    fn id(&self) -> &str {
        "supervisor"
    }

    async fn run(&self, mut state: ChatbotState) -> Result<(ChatbotState, Next), TurnError> {
        let run = self
            .runtime
            .run(&self.prepared, &state.user_query, state.prior_history());
        let outcome = match tokio::time::timeout(self.timeout, run).await {
            Ok(result) => result?,
            Err(_) => return Err(TurnError::SupervisorTimeout(self.timeout.as_secs_f64())),
        };
        info!(
            tools_used = ?outcome.tools_used,
            steps = outcome.metadata.steps,
            "supervisor finished"
        );
        state.agent_results = outcome.response;
        state.workflow_step = WorkflowStep::Formatter;
        Ok((state, Next::Continue))
    }
}

/// The formatter step: one model call, raw-findings fallback inside.
pub struct FormatterNode {
    pub formatter: Formatter,
}

impl FormatterNode {
    async fn run_with_sink(
        &self,
        mut state: ChatbotState,
        sink: Option<&ProgressSink>,
    ) -> Result<(ChatbotState, Next), TurnError> {
        let reply = self
            .formatter
            .format(
                &state.user_query,
                &state.agent_results,
                state.prior_history(),
                sink,
            )
            .await;
        state.chatbot_response = reply;
        Ok((state, Next::End))
    }
}

#[async_trait::async_trait]
impl Node<ChatbotState> for FormatterNode {
    fn id(&self) -> &str {
        "formatter"
    }

    async fn run(&self, state: ChatbotState) -> Result<(ChatbotState, Next), TurnError> {
        self.run_with_sink(state, None).await
    }
}

/// Executes the fixed two-node workflow for one turn.
pub struct GraphExecutor {
    supervisor: SupervisorNode,
    formatter: FormatterNode,
}

impl GraphExecutor {
    pub fn new(
        supervisor_prepared: PreparedAgent,
        supervisor_runtime: AgentRuntime,
        supervisor_timeout: Duration,
        formatter: Formatter,
    ) -> Self {
        Self {
            supervisor: SupervisorNode {
                prepared: supervisor_prepared,
                runtime: supervisor_runtime,
                timeout: supervisor_timeout,
            },
            formatter: FormatterNode { formatter },
        }
    }

    /// Runs one turn to completion. Never returns an error: failures land in
    /// the state (`workflow_step = Error`, translated `chatbot_response`) and
    /// on the sink. On success exactly one Assistant message — the formatted
    /// reply, never the raw findings — is appended to the history.
    pub async fn run_turn(
        &self,
        state: ChatbotState,
        sink: Option<&ProgressSink>,
    ) -> ChatbotState {
        let snapshot = state.clone();
        let state = match self.supervisor.run(state).await {
            Ok((state, _)) => state,
            Err(e) => {
                error!("turn aborted in supervisor: {}", e);
                return Self::fail(snapshot, e, sink).await;
            }
        };

        // Formatter failures are absorbed inside the node (raw fallback), so
        // this step only errs on programmer mistakes upstream.
        let mut state = match self.formatter.run_with_sink(state, sink).await {
            Ok((state, _)) => state,
            Err(e) => {
                error!("turn aborted in formatter: {}", e);
                return Self::fail(snapshot, e, sink).await;
            }
        };

        state
            .messages
            .push(Message::assistant(state.chatbot_response.clone()));
        state.workflow_step = WorkflowStep::Complete;
        if let Some(sink) = sink {
            sink.send(ProgressEvent::Final {
                text: state.chatbot_response.clone(),
            })
            .await;
        }
        state
    }

    /// Error path: the pre-turn state is kept (no partial mutations survive),
    /// the formatter is skipped, and nothing is appended to history.
    async fn fail(
        mut state: ChatbotState,
        e: TurnError,
        sink: Option<&ProgressSink>,
    ) -> ChatbotState {
        let message = e.user_message();
        if let Some(sink) = sink {
            sink.send(ProgressEvent::Error {
                message: message.to_string(),
            })
            .await;
        }
        state.chatbot_response = message.to_string();
        state.workflow_step = WorkflowStep::Error;
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_are_fixed_strings() {
        assert_eq!(
            TurnError::SupervisorTimeout(5.0).user_message(),
            "The request took too long; try a narrower query."
        );
        assert_eq!(
            TurnError::Run(RunError::Llm(LlmError::RateLimit)).user_message(),
            "API rate limit reached; please retry in a moment."
        );
        assert_eq!(
            TurnError::Run(RunError::RecursionExceeded {
                agent: "a".into(),
                limit: 3
            })
            .user_message(),
            "The request required too many steps; please simplify."
        );
        assert_eq!(
            TurnError::Run(RunError::Llm(LlmError::Auth("bad key".into()))).user_message(),
            "An error occurred while processing your request."
        );
    }
}
