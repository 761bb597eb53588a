//! Prompt text for the engine: supervisor, formatter sections, summarization,
//! and the datetime phrase guide.
//!
//! **Canonical source**: the YAML files under `switchboard/prompts/`, embedded
//! at compile time. A `PROMPTS_DIR` directory (or an explicit path) overrides
//! them at runtime; missing files in an override directory keep the embedded
//! text. Code constants exist only as last-resort fallbacks for empty fields.

mod load;

pub use load::{load, load_or_default, LoadError};

use serde::Deserialize;

/// `supervisor.yaml`: base routing prompt and the specialist planning block.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SupervisorPromptsFile {
    pub base_prompt: Option<String>,
    pub planning_prompt: Option<String>,
}

/// `formatter.yaml`: the four composable sections.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FormatterPromptsFile {
    pub core: Option<String>,
    pub tone: Option<String>,
    pub format: Option<String>,
    pub extra: Option<String>,
}

/// `summarize.yaml`: the history-compression prompt.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SummarizePromptsFile {
    pub prompt: Option<String>,
}

/// `datetime.yaml`: phrase-interpretation guidance for full-mode datetime.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DatetimePromptsFile {
    pub phrase_guide: Option<String>,
}

const DEFAULT_SUPERVISOR_BASE: &str =
    "You are the supervisor of a team of specialist agents. Route each query to \
     the best-suited specialists and combine their answers.";
const DEFAULT_PLANNING: &str =
    "Plan before answering: decompose the request, issue independent tool calls \
     together, review results for completeness, then answer.";
const DEFAULT_FORMATTER_CORE: &str =
    "Turn the raw agent findings into a single natural reply; keep every \
     concrete fact and number.";
const DEFAULT_SUMMARIZE: &str =
    "Condense the conversation into a compact synopsis preserving facts, \
     decisions, and open questions. Reply with the synopsis only.";

/// Resolved prompt set for one engine instance.
#[derive(Clone, Debug, Default)]
pub struct EnginePrompts {
    pub supervisor: SupervisorPromptsFile,
    pub formatter: FormatterPromptsFile,
    pub summarize: SummarizePromptsFile,
    pub datetime: DatetimePromptsFile,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl EnginePrompts {
    pub fn supervisor_base(&self) -> &str {
        non_empty(&self.supervisor.base_prompt).unwrap_or(DEFAULT_SUPERVISOR_BASE)
    }

    pub fn planning(&self) -> &str {
        non_empty(&self.supervisor.planning_prompt).unwrap_or(DEFAULT_PLANNING)
    }

    pub fn formatter_core(&self) -> &str {
        non_empty(&self.formatter.core).unwrap_or(DEFAULT_FORMATTER_CORE)
    }

    pub fn formatter_tone(&self) -> &str {
        non_empty(&self.formatter.tone).unwrap_or("")
    }

    pub fn formatter_format(&self) -> &str {
        non_empty(&self.formatter.format).unwrap_or("")
    }

    pub fn formatter_extra(&self) -> &str {
        non_empty(&self.formatter.extra).unwrap_or("")
    }

    pub fn summarize_prompt(&self) -> &str {
        non_empty(&self.summarize.prompt).unwrap_or(DEFAULT_SUMMARIZE)
    }

    pub fn datetime_phrase_guide(&self) -> &str {
        non_empty(&self.datetime.phrase_guide).unwrap_or("")
    }
}
