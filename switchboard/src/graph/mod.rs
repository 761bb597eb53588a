//! The turn workflow: a fixed two-node graph, supervisor → formatter.
//!
//! [`ChatbotState`] is the value that flows through the graph for one turn.
//! Nodes are state-in, state-out: each receives the state, returns the
//! updated state and a [`Next`] routing decision. The executor owns the
//! timeout hierarchy and the translation of engine errors into user-visible
//! messages.

mod executor;

pub use executor::{GraphExecutor, TurnError};

use async_trait::async_trait;
use std::fmt::Debug;

use crate::message::Message;

/// Where a turn currently is in the workflow.
///
/// Legal transitions: Supervisor → Formatter → Complete, or → Error from any
/// state. There is no way back out of Complete or Error within a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowStep {
    Supervisor,
    Formatter,
    Complete,
    Error,
}

/// The value flowing through one turn.
#[derive(Clone, Debug)]
pub struct ChatbotState {
    /// Conversation history including this turn's User message. Grows
    /// append-only except at summarization boundaries.
    pub messages: Vec<Message>,
    /// This turn's input; redundant with the last User message.
    pub user_query: String,
    /// The supervisor's raw output. Never appended to `messages`.
    pub agent_results: String,
    /// The final user-visible reply.
    pub chatbot_response: String,
    pub workflow_step: WorkflowStep,
}

impl ChatbotState {
    /// Starts a turn: prior history plus the new User message.
    pub fn for_turn(mut history: Vec<Message>, query: impl Into<String>) -> Self {
        let query = query.into();
        history.push(Message::user(query.clone()));
        Self {
            messages: history,
            user_query: query,
            agent_results: String::new(),
            chatbot_response: String::new(),
            workflow_step: WorkflowStep::Supervisor,
        }
    }

    /// History excluding this turn's trailing User message; what agents get
    /// as prior context (they re-add the query themselves).
    pub fn prior_history(&self) -> &[Message] {
        match self.messages.last() {
            Some(Message::User { .. }) => &self.messages[..self.messages.len() - 1],
            _ => &self.messages[..],
        }
    }
}

/// Routing decision after one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Next {
    /// Follow the edge order to the next node.
    Continue,
    /// Stop the graph here.
    End,
}

/// One step in the workflow: state in, (state out, next step).
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Node id (e.g. `"supervisor"`, `"formatter"`).
    fn id(&self) -> &str;

    async fn run(&self, state: S) -> Result<(S, Next), TurnError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_turn_appends_user_message() {
        let history = vec![Message::user("earlier"), Message::assistant("reply")];
        let state = ChatbotState::for_turn(history, "new question");
        assert_eq!(state.messages.len(), 3);
        assert_eq!(state.messages.last().unwrap().text(), "new question");
        assert_eq!(state.user_query, "new question");
        assert_eq!(state.workflow_step, WorkflowStep::Supervisor);
    }

    #[test]
    fn prior_history_excludes_current_query() {
        let state = ChatbotState::for_turn(vec![Message::assistant("old")], "q");
        assert_eq!(state.prior_history().len(), 1);
        assert_eq!(state.prior_history()[0].text(), "old");
    }
}
