//! Knowledge tool instructions and inventory, pre-injected into the prompt.
//!
//! Constructed once per agent at startup: inspects the agent's tool names,
//! reads the top-level document inventory from disk (synchronous I/O is fine
//! here — this is construction, not a request path), and caches the full
//! block. Per call it only prepends a static string to the system message.
//!
//! There is no `list_*` tool: the inventory below *is* the listing, so the
//! model spends tool calls on document bodies only.

use super::Middleware;
use crate::knowledge::{KnowledgeCategory, KnowledgeStore};
use crate::llm::ModelRequest;
use crate::tools::ToolSpec;

pub struct ToolInstructions {
    block: String,
}

impl ToolInstructions {
    /// Builds the middleware when the tool set contains knowledge readers;
    /// `None` otherwise (the agent gets no knowledge section at all).
    pub fn for_tools(tools: &[ToolSpec], store: &KnowledgeStore) -> Option<Self> {
        let has_skills = tools
            .iter()
            .any(|t| t.name == KnowledgeCategory::Skills.tool_name());
        let has_facts = tools
            .iter()
            .any(|t| t.name == KnowledgeCategory::Facts.tool_name());
        if !has_skills && !has_facts {
            return None;
        }

        let mut block = String::new();
        match (has_skills, has_facts) {
            (true, true) => {
                block.push_str(
                    "## Knowledge System\n\
                     You have a knowledge base of skills (procedures) and facts \
                     (reference data). Use read_skill(path) for procedures and \
                     read_fact(path) for reference data. Paths under a listed \
                     document (e.g. deploy/frontend.md) hold deeper detail.\n",
                );
            }
            (true, false) => {
                block.push_str(
                    "## Skills\n\
                     Use read_skill(path) to retrieve procedures before acting on \
                     a task a listed skill covers.\n",
                );
            }
            (false, true) => {
                block.push_str(
                    "## Facts\n\
                     Use read_fact(path) to retrieve reference data instead of \
                     guessing values a listed fact sheet covers.\n",
                );
            }
            (false, false) => unreachable!(),
        }

        if has_skills {
            push_inventory(&mut block, store, KnowledgeCategory::Skills);
        }
        if has_facts {
            push_inventory(&mut block, store, KnowledgeCategory::Facts);
        }

        Some(Self { block })
    }

    #[cfg(test)]
    pub(crate) fn block(&self) -> &str {
        &self.block
    }
}

fn push_inventory(block: &mut String, store: &KnowledgeStore, category: KnowledgeCategory) {
    block.push_str(&format!("\nAvailable {}:\n", category.heading().to_lowercase()));
    let entries = store.list_top_level(category);
    if entries.is_empty() {
        block.push_str("(none)\n");
        return;
    }
    for entry in entries {
        block.push_str(&format!(
            "- {} — {} ({})\n",
            entry.name, entry.description, entry.relative_path
        ));
    }
}

impl Middleware for ToolInstructions {
    fn before_model(&self, request: &mut ModelRequest) {
        let existing = request.system.take().unwrap_or_default();
        let system = if existing.is_empty() {
            self.block.clone()
        } else {
            format!("{}\n\n{}", self.block, existing)
        };
        request.system = Some(system);
    }
}
