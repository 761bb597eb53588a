//! Reader tools for knowledge documents: `read_skill(path)` / `read_fact(path)`.
//!
//! There is deliberately no listing tool — the inventory of top-level
//! documents is pre-injected into the system prompt, so the model already
//! knows what exists and spends tool calls only on content.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::tools::{Tool, ToolError, ToolSpec};

use super::{KnowledgeCategory, KnowledgeStore};

/// Reads one knowledge document body by relative path.
pub struct KnowledgeReadTool {
    store: Arc<KnowledgeStore>,
    category: KnowledgeCategory,
}

impl KnowledgeReadTool {
    pub fn new(store: Arc<KnowledgeStore>, category: KnowledgeCategory) -> Self {
        Self { store, category }
    }
}

#[async_trait]
impl Tool for KnowledgeReadTool {
    fn name(&self) -> &str {
        self.category.tool_name()
    }

    fn spec(&self) -> ToolSpec {
        let (noun, example) = match self.category {
            KnowledgeCategory::Skills => ("skill (a procedure)", "deploy.md or deploy/frontend.md"),
            KnowledgeCategory::Facts => ("fact sheet (reference data)", "regions.md"),
        };
        ToolSpec {
            name: self.category.tool_name().to_string(),
            description: format!(
                "Read a {} by path relative to the {} directory, e.g. {}.",
                noun,
                self.category.dir_name(),
                example
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Document path relative to the category root."
                    }
                },
                "required": ["path"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let path = args
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidInput("missing required argument: path".into()))?;
        self.store.read(self.category, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_skill() -> (tempfile::TempDir, Arc<KnowledgeStore>) {
        let dir = tempfile::tempdir().unwrap();
        let skills = dir.path().join("skills");
        std::fs::create_dir_all(&skills).unwrap();
        std::fs::write(
            skills.join("deploy.md"),
            "---\nname: deploy\ndescription: how to deploy\n---\nShip it.\n",
        )
        .unwrap();
        let store = Arc::new(KnowledgeStore::new(dir.path()));
        (dir, store)
    }

    #[tokio::test]
    async fn reads_document_body() {
        let (_dir, store) = store_with_skill();
        let tool = KnowledgeReadTool::new(store, KnowledgeCategory::Skills);
        let body = tool.call(json!({"path": "deploy.md"})).await.unwrap();
        assert_eq!(body.trim(), "Ship it.");
    }

    #[tokio::test]
    async fn missing_path_argument_is_invalid_input() {
        let (_dir, store) = store_with_skill();
        let tool = KnowledgeReadTool::new(store, KnowledgeCategory::Skills);
        let err = tool.call(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn spec_names_match_category() {
        let (_dir, store) = store_with_skill();
        let tool = KnowledgeReadTool::new(store, KnowledgeCategory::Skills);
        assert_eq!(tool.name(), "read_skill");
        assert!(tool.spec().description.contains("skills"));
    }
}
