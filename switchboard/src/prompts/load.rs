//! Load prompt YAML from a directory, falling back to the embedded defaults.

use std::path::Path;

use serde::Deserialize;

use super::{
    DatetimePromptsFile, EnginePrompts, FormatterPromptsFile, SummarizePromptsFile,
    SupervisorPromptsFile,
};

/// Embedded default YAML (canonical source: `switchboard/prompts/*.yaml`).
macro_rules! embed_prompt_yaml {
    ($name:literal) => {
        include_str!(concat!("../../prompts/", $name))
    };
}
const EMBED_SUPERVISOR: &str = embed_prompt_yaml!("supervisor.yaml");
const EMBED_FORMATTER: &str = embed_prompt_yaml!("formatter.yaml");
const EMBED_SUMMARIZE: &str = embed_prompt_yaml!("summarize.yaml");
const EMBED_DATETIME: &str = embed_prompt_yaml!("datetime.yaml");

const SUPERVISOR_FILE: &str = "supervisor.yaml";
const FORMATTER_FILE: &str = "formatter.yaml";
const SUMMARIZE_FILE: &str = "summarize.yaml";
const DATETIME_FILE: &str = "datetime.yaml";

/// Default directory name when `PROMPTS_DIR` is not set.
const DEFAULT_PROMPTS_DIR: &str = "prompts";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("prompts directory not found or not readable: {0}")]
    DirNotFound(String),
    #[error("failed to read prompts file {path}: {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse YAML in {path}: {message}")]
    ParseYaml { path: String, message: String },
}

fn prompts_dir(dir: Option<&Path>) -> std::path::PathBuf {
    dir.map(std::path::PathBuf::from).unwrap_or_else(|| {
        std::env::var("PROMPTS_DIR")
            .ok()
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|| std::path::PathBuf::from(DEFAULT_PROMPTS_DIR))
    })
}

fn read_yaml_file<T>(dir: &Path, name: &str) -> Result<Option<T>, LoadError>
where
    T: for<'de> Deserialize<'de>,
{
    let path = dir.join(name);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Ok(None);
            }
            return Err(LoadError::ReadFile {
                path: path.display().to_string(),
                message: e.to_string(),
            });
        }
    };
    let value: T = serde_yaml::from_str(&content).map_err(|e| LoadError::ParseYaml {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(Some(value))
}

/// Applies env overrides: `SUPERVISOR_BASE_PROMPT` replaces the base prompt.
fn apply_env(mut file: SupervisorPromptsFile) -> SupervisorPromptsFile {
    if let Ok(s) = std::env::var("SUPERVISOR_BASE_PROMPT") {
        file.base_prompt = Some(s);
    }
    file
}

/// Loads prompts from a directory. Missing files keep their embedded text;
/// a present file that fails to parse is an error. When `dir` is `None`, the
/// `PROMPTS_DIR` env var or `./prompts` is used, and the directory must exist.
pub fn load(dir: Option<&Path>) -> Result<EnginePrompts, LoadError> {
    let base = prompts_dir(dir);
    if !base.is_dir() {
        return Err(LoadError::DirNotFound(base.display().to_string()));
    }
    let embedded = default_from_embedded();
    let supervisor = read_yaml_file::<SupervisorPromptsFile>(&base, SUPERVISOR_FILE)?
        .map(apply_env)
        .unwrap_or(embedded.supervisor);
    let formatter = read_yaml_file::<FormatterPromptsFile>(&base, FORMATTER_FILE)?
        .unwrap_or(embedded.formatter);
    let summarize = read_yaml_file::<SummarizePromptsFile>(&base, SUMMARIZE_FILE)?
        .unwrap_or(embedded.summarize);
    let datetime = read_yaml_file::<DatetimePromptsFile>(&base, DATETIME_FILE)?
        .unwrap_or(embedded.datetime);
    Ok(EnginePrompts {
        supervisor,
        formatter,
        summarize,
        datetime,
    })
}

/// Parses the embedded YAML. Single source of truth for default prompt text.
pub fn default_from_embedded() -> EnginePrompts {
    let supervisor: SupervisorPromptsFile =
        serde_yaml::from_str(EMBED_SUPERVISOR).unwrap_or_default();
    let supervisor = apply_env(supervisor);
    let formatter: FormatterPromptsFile = serde_yaml::from_str(EMBED_FORMATTER).unwrap_or_default();
    let summarize: SummarizePromptsFile = serde_yaml::from_str(EMBED_SUMMARIZE).unwrap_or_default();
    let datetime: DatetimePromptsFile = serde_yaml::from_str(EMBED_DATETIME).unwrap_or_default();
    EnginePrompts {
        supervisor,
        formatter,
        summarize,
        datetime,
    }
}

/// Loads from `dir` when it exists, otherwise returns the embedded defaults.
pub fn load_or_default(dir: Option<&Path>) -> EnginePrompts {
    load(dir).unwrap_or_else(|_| default_from_embedded())
}
