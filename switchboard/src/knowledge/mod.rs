//! Knowledge documents packaged with an agent: skills (procedures) and facts
//! (reference data).
//!
//! Each category is a directory of text files carrying a `---`-delimited
//! header (`name`, `description`, arbitrary extras) followed by a markdown
//! body. Only top-level files appear in the inventory injected into the
//! agent's prompt; files in subdirectories stay reachable through explicit
//! path reads — progressive disclosure keeps the prompt small while deeper
//! material remains one tool call away.
//!
//! Reads refuse any path that escapes the category root with
//! [`ToolError::PathTraversal`](crate::tools::ToolError::PathTraversal) —
//! first lexically, so a `..` escape is caught whether or not its target
//! exists, then again after canonicalization for symlinked targets.

mod document;
mod read_tool;

pub use document::{parse_document, DocumentHeader};
pub use read_tool::KnowledgeReadTool;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::tools::{Tool, ToolError};

/// Document category: which subtree and which reader tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnowledgeCategory {
    Skills,
    Facts,
}

impl KnowledgeCategory {
    pub fn dir_name(&self) -> &'static str {
        match self {
            KnowledgeCategory::Skills => "skills",
            KnowledgeCategory::Facts => "facts",
        }
    }

    /// Name of the reader tool exposed to the agent.
    pub fn tool_name(&self) -> &'static str {
        match self {
            KnowledgeCategory::Skills => "read_skill",
            KnowledgeCategory::Facts => "read_fact",
        }
    }

    /// Section heading used in the injected inventory.
    pub fn heading(&self) -> &'static str {
        match self {
            KnowledgeCategory::Skills => "Skills",
            KnowledgeCategory::Facts => "Facts",
        }
    }
}

/// One inventory entry: a top-level document's name, path, and description.
#[derive(Clone, Debug, PartialEq)]
pub struct InventoryEntry {
    pub name: String,
    pub relative_path: String,
    pub description: String,
}

/// Loader for one agent package's knowledge directories.
///
/// Immutable after construction; shared via `Arc` between the reader tools
/// and the inventory-injecting middleware.
#[derive(Debug)]
pub struct KnowledgeStore {
    root: PathBuf,
}

impl KnowledgeStore {
    /// `root` is the agent package directory containing `skills/` and/or
    /// `facts/`. Neither subtree has to exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn category_root(&self, category: KnowledgeCategory) -> PathBuf {
        self.root.join(category.dir_name())
    }

    /// Whether the category directory exists (drives which reader tools an
    /// agent gets).
    pub fn has_category(&self, category: KnowledgeCategory) -> bool {
        self.category_root(category).is_dir()
    }

    /// Lists top-level documents only: files directly under the category root,
    /// sorted by file name for deterministic inventories. Subdirectory
    /// documents are deliberately absent.
    pub fn list_top_level(&self, category: KnowledgeCategory) -> Vec<InventoryEntry> {
        let dir = self.category_root(category);
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        let mut out = Vec::new();
        for path in files {
            let Ok(text) = std::fs::read_to_string(&path) else {
                continue;
            };
            let (header, _) = parse_document(&text);
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let stem = path
                .file_stem()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            out.push(InventoryEntry {
                name: header.name.unwrap_or(stem),
                relative_path: file_name,
                description: header.description.unwrap_or_default(),
            });
        }
        out
    }

    /// Reads a document body by path relative to the category root. The path
    /// may point into a subdirectory (progressive disclosure); it may not
    /// escape the root. Escaping paths are refused whether or not their
    /// target exists.
    pub fn read(&self, category: KnowledgeCategory, path: &str) -> Result<String, ToolError> {
        if escapes_root(path) {
            return Err(ToolError::PathTraversal(path.to_string()));
        }
        let dir = self.category_root(category);
        let candidate = dir.join(path);
        let canonical_dir = dir
            .canonicalize()
            .map_err(|_| ToolError::InvalidInput(format!(
                "no {} directory for this agent",
                category.dir_name()
            )))?;
        let canonical = candidate
            .canonicalize()
            .map_err(|_| ToolError::InvalidInput(format!("document not found: {}", path)))?;
        // Symlinked targets resolve outside the root even when the lexical
        // path stays inside it.
        if !canonical.starts_with(&canonical_dir) {
            return Err(ToolError::PathTraversal(path.to_string()));
        }
        let text = std::fs::read_to_string(&canonical)
            .map_err(|e| ToolError::Execution(format!("read {}: {}", path, e)))?;
        let (_, body) = parse_document(&text);
        Ok(body)
    }

    /// Reader tools for the categories present on disk: `read_skill` and/or
    /// `read_fact`. An agent with no knowledge directories gets none.
    pub fn tools(self: &Arc<Self>) -> Vec<Arc<dyn Tool>> {
        [KnowledgeCategory::Skills, KnowledgeCategory::Facts]
            .into_iter()
            .filter(|c| self.has_category(*c))
            .map(|c| Arc::new(KnowledgeReadTool::new(Arc::clone(self), c)) as Arc<dyn Tool>)
            .collect()
    }
}

/// Lexical escape check, independent of the filesystem: absolute paths, and
/// any `..` that climbs above the root at any point, are escapes — the target
/// does not have to exist to be refused.
fn escapes_root(path: &str) -> bool {
    let mut depth: i32 = 0;
    for component in Path::new(path).components() {
        match component {
            std::path::Component::Normal(_) => depth += 1,
            std::path::Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            std::path::Component::CurDir => {}
            std::path::Component::RootDir | std::path::Component::Prefix(_) => return true,
        }
    }
    false
}
