//! Layered configuration sources for switchboard, resolved with priority:
//! **process env > `.env` > `secrets.yml` > `config.yml` > caller defaults**.
//!
//! This crate only loads and merges raw key/value layers; the typed settings
//! surface (validation, defaults, timeout invariants) lives in
//! `switchboard::settings` and consumes a [`Layers`] value.
//!
//! Keys are normalized to uppercase snake form; nested mappings flatten with a
//! double underscore (`url_security.enabled` → `URL_SECURITY__ENABLED`), which
//! makes file keys and environment variables the same namespace. Sequences of
//! scalars flatten to comma-joined strings for the same reason.
//!
//! Missing files are fine (empty layer). A file that exists but fails to parse
//! is a hard [`LoadError`] — configuration is fail-closed.

mod dotenv;
mod yaml_layer;

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

/// Default file names searched in the working directory.
pub const CONFIG_FILE: &str = "config.yml";
pub const SECRETS_FILE: &str = "secrets.yml";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("parse {path}: {message}")]
    Parse { path: String, message: String },
    #[error("read .env: {0}")]
    DotenvRead(std::io::Error),
}

/// Merged configuration layers for one working directory.
///
/// **Interaction**: constructed once at process start by the CLI / server
/// entrypoint and handed to `Settings::load`. Lookups never touch the
/// filesystem after construction.
pub struct Layers {
    dotenv: HashMap<String, String>,
    secrets: HashMap<String, String>,
    file: HashMap<String, String>,
    tree: serde_yaml::Value,
}

impl Layers {
    /// Loads `config.yml`, `secrets.yml`, and `.env` from `dir` (current
    /// directory when `None`). Missing files yield empty layers.
    pub fn load(dir: Option<&Path>) -> Result<Self, LoadError> {
        let dir = dir
            .map(Path::to_path_buf)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| std::path::PathBuf::from("."));

        let (file, tree) = yaml_layer::load_flattened(&dir.join(CONFIG_FILE))?;
        let (secrets, _) = yaml_layer::load_flattened(&dir.join(SECRETS_FILE))?;
        let dotenv = dotenv::load_env_map(&dir).map_err(LoadError::DotenvRead)?;

        Ok(Self {
            dotenv,
            secrets,
            file,
            tree,
        })
    }

    /// Empty layers (defaults only); used by tests and embedded setups.
    pub fn empty() -> Self {
        Self {
            dotenv: HashMap::new(),
            secrets: HashMap::new(),
            file: HashMap::new(),
            tree: serde_yaml::Value::Null,
        }
    }

    /// Resolves `key` (uppercase snake, `__` for nesting) across the layers:
    /// process env first, then `.env`, then secrets, then the config file.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Ok(v) = std::env::var(key) {
            return Some(v);
        }
        self.dotenv
            .get(key)
            .or_else(|| self.secrets.get(key))
            .or_else(|| self.file.get(key))
            .cloned()
    }

    /// Which layer a lookup would resolve from; `None` when the key is absent
    /// everywhere (caller falls back to its default).
    pub fn source_of(&self, key: &str) -> Option<&'static str> {
        if std::env::var(key).is_ok() {
            Some("env")
        } else if self.dotenv.contains_key(key) {
            Some(".env")
        } else if self.secrets.contains_key(key) {
            Some("secrets.yml")
        } else if self.file.contains_key(key) {
            Some("config.yml")
        } else {
            None
        }
    }

    /// The raw `config.yml` document; `Null` when the file was absent. Used
    /// for structure-preserving reads (per-agent extras subtrees).
    pub fn tree(&self) -> &serde_yaml::Value {
        &self.tree
    }
}
