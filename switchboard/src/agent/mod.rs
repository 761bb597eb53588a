//! Agents: named, capability-described bundles of tools driven by one model.
//!
//! An [`Agent`] is plain data — name, capabilities text, tools. The
//! capabilities string is used twice by design: as the agent's own base
//! system prompt, and as the supervisor's routing cue for that agent. One
//! string, no duplication, no drift.
//!
//! Execution lives in [`AgentRuntime`]; exposing an agent as a tool for a
//! parent agent lives in [`SpecialistTool`].

mod agent_tool;
mod runtime;

pub use agent_tool::SpecialistTool;
pub use runtime::AgentRuntime;

use std::sync::Arc;

use thiserror::Error;

use crate::knowledge::KnowledgeStore;
use crate::llm::LlmError;
use crate::tools::{Tool, ToolSpec};

/// A registered agent: identity, routing text, and capabilities.
pub struct Agent {
    /// Unique process-wide identifier (valid identifier characters).
    pub name: String,
    /// Free-text description: the agent's base instructions *and* the
    /// supervisor's routing cue.
    pub capabilities: String,
    pub tools: Vec<Arc<dyn Tool>>,
    /// Knowledge directories packaged with this agent, when any.
    pub knowledge: Option<Arc<KnowledgeStore>>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        capabilities: impl Into<String>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Self {
        Self {
            name: name.into(),
            capabilities: capabilities.into(),
            tools,
            knowledge: None,
        }
    }

    /// Attaches a knowledge store and appends its reader tools
    /// (`read_skill` / `read_fact`) for the categories present on disk.
    pub fn with_knowledge(mut self, store: Arc<KnowledgeStore>) -> Self {
        self.tools.extend(store.tools());
        self.knowledge = Some(store);
        self
    }

    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// First line of the capabilities text; used by listings.
    pub fn short_description(&self) -> &str {
        self.capabilities.lines().next().unwrap_or("")
    }
}

/// An agent ready to run: resolved system prompt plus tools.
///
/// For specialists the prompt is `capabilities ⊕ planning block`; for the
/// supervisor it is the composed routing prompt from
/// [`SupervisorBuilder`](crate::supervisor::SupervisorBuilder).
pub struct PreparedAgent {
    pub name: String,
    pub system_prompt: String,
    pub tools: Vec<Arc<dyn Tool>>,
}

impl PreparedAgent {
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }
}

/// Metadata attached to one agent invocation's outcome.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunMetadata {
    /// Tool-loop rounds executed.
    pub steps: usize,
    /// The invocation was cut short by its timeout.
    pub timed_out: bool,
}

/// Result of one agent invocation.
#[derive(Clone, Debug)]
pub struct AgentOutcome {
    pub response: String,
    pub agent_name: String,
    /// Tool names in invocation order (duplicates kept).
    pub tools_used: Vec<String>,
    pub metadata: RunMetadata,
}

/// Agent-level failures. Recoverable by a parent agent when the failing agent
/// runs as a tool; terminal otherwise.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("agent {agent} needed more than {limit} tool-loop steps")]
    RecursionExceeded { agent: String, limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_description_is_first_line() {
        let agent = Agent::new(
            "research",
            "answers research questions\nknows about papers",
            Vec::new(),
        );
        assert_eq!(agent.short_description(), "answers research questions");
    }

    #[test]
    fn with_knowledge_appends_reader_tools() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("skills")).unwrap();
        let store = Arc::new(KnowledgeStore::new(dir.path()));
        let agent = Agent::new("helper", "helps", Vec::new()).with_knowledge(store);
        let names: Vec<String> = agent.tool_specs().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["read_skill"]);
        assert!(agent.knowledge.is_some());
    }
}
