//! Supervisor composition: prompt from registered capabilities + wrapper tools.
//!
//! Rebuilt at the start of each turn (registration can change between turns,
//! even if it rarely does). The capabilities section concatenates every
//! registered agent's text in insertion order, each under its name — building
//! twice against the same registry is byte-identical, so provider prompt
//! caching works across turns.

use std::sync::Arc;

use crate::agent::{Agent, PreparedAgent};
use crate::prompts::EnginePrompts;
use crate::registry::AgentRegistry;
use crate::tools::Tool;

/// Reserved name of the supervisor agent.
pub const SUPERVISOR_NAME: &str = "supervisor";

pub struct SupervisorBuilder {
    base_prompt: String,
    planning_prompt: String,
}

impl SupervisorBuilder {
    pub fn new(prompts: &EnginePrompts) -> Self {
        Self {
            base_prompt: prompts.supervisor_base().to_string(),
            planning_prompt: prompts.planning().to_string(),
        }
    }

    pub fn with_base_prompt(mut self, base: impl Into<String>) -> Self {
        self.base_prompt = base.into();
        self
    }

    /// The capabilities section: one block per registered agent, insertion
    /// order, name-prefixed. Empty registry yields an explicit note so the
    /// supervisor knows it is on its own.
    fn capabilities_section(registry: &AgentRegistry) -> String {
        let agents = registry.get_all();
        if agents.is_empty() {
            return "No specialist agents are registered; answer every query yourself.".to_string();
        }
        let mut out = String::from("Registered specialists:\n");
        for agent in agents {
            out.push_str(&format!("\n### {}\n{}\n", agent.name, agent.capabilities.trim_end()));
        }
        out
    }

    /// Builds the full supervisor system prompt:
    /// `base ⊕ capabilities ⊕ planning`.
    pub fn build_prompt(&self, registry: &AgentRegistry) -> String {
        format!(
            "{}\n\n{}\n\n{}",
            self.base_prompt.trim_end(),
            Self::capabilities_section(registry),
            self.planning_prompt.trim_end()
        )
    }

    /// Builds the supervisor agent for this turn: composed prompt plus one
    /// wrapper tool per registered agent (created by `make_tool`).
    pub fn build(
        &self,
        registry: &AgentRegistry,
        make_tool: impl Fn(&Arc<Agent>) -> Arc<dyn Tool>,
    ) -> PreparedAgent {
        let tools = registry.get_all().iter().map(&make_tool).collect();
        PreparedAgent {
            name: SUPERVISOR_NAME.to_string(),
            system_prompt: self.build_prompt(registry),
            tools,
        }
    }
}
