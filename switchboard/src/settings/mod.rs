//! Typed engine settings resolved from layered sources.
//!
//! Raw key/value layers come from the `config` crate (process env > `.env` >
//! `secrets.yml` > `config.yml`); this module gives them types, defaults, and
//! fail-closed validation: every malformed value is collected and reported in
//! one [`ConfigurationError`] rather than first-error-wins.
//!
//! Unknown top-level keys in `config.yml` are not errors — they are kept in
//! `extras` so agent packages can carry their own subtrees
//! (`my_agent: { recursion_limit: 100 }`), read back via
//! [`Settings::extras_for`].
//!
//! The timeout ordering `llm_request_timeout ≤ specialist_timeout ≤
//! supervisor_timeout` is checked at load; violations log a warning but do not
//! fail construction.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::warn;

use config::Layers;

/// Reasoning-effort hint passed through to the model provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

impl FromStr for ReasoningEffort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!(
                "unknown reasoning effort: {} (use low, medium, or high)",
                s
            )),
        }
    }
}

/// URL allowlist policy settings (`url_security` section).
#[derive(Clone, Debug)]
pub struct UrlSecuritySettings {
    pub enabled: bool,
    /// Exact hosts or `*.host.tld` wildcards (strict suffix match).
    pub allow_domains: Vec<String>,
    /// CIDR ranges, e.g. `10.0.0.0/8`.
    pub allow_ips: Vec<String>,
    pub allow_localhost: bool,
    pub log_blocked_attempts: bool,
}

impl Default for UrlSecuritySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_domains: Vec::new(),
            allow_ips: Vec::new(),
            allow_localhost: true,
            log_blocked_attempts: true,
        }
    }
}

/// Config construction failure: one entry per offending key.
#[derive(Debug, Error)]
#[error("invalid configuration:\n  {}", problems.join("\n  "))]
pub struct ConfigurationError {
    pub problems: Vec<String>,
}

/// The engine's typed configuration surface.
///
/// Cheap to clone; constructed once per process by the entrypoint and passed
/// down by value (constructor injection). A process-scoped handle exists for
/// deep call sites ([`process_settings`]) but the engine core takes settings
/// as a parameter.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Chatbot name: CLI banner, API-key env prefix (`<NAME>_API_KEY`).
    pub name: String,
    pub llm_model: String,
    pub llm_base_url: String,
    /// 0.0–1.0.
    pub llm_temperature: f64,
    pub llm_reasoning_effort: ReasoningEffort,
    /// Max tool-loop iterations per agent invocation.
    pub recursion_limit: usize,
    /// Seconds; outermost bound of one turn's agent work.
    pub supervisor_timeout: f64,
    /// Seconds; bound of one specialist-as-tool invocation.
    pub specialist_timeout: f64,
    /// Seconds; bound of the single formatter call.
    pub formatter_timeout: f64,
    /// Seconds; bound of one LLM HTTP request.
    pub llm_request_timeout: f64,
    pub summarization_enabled: bool,
    /// Approximate token threshold that triggers history compression.
    pub summarization_trigger_tokens: u32,
    /// Messages kept verbatim when the prefix is summarized.
    pub summarization_keep_messages: usize,
    pub debug: bool,
    pub debug_prompt_max_length: usize,
    pub debug_show_response: bool,
    pub url_security: UrlSecuritySettings,
    pub log_level: String,
    pub log_dir: String,
    /// Explicit log file name; timestamped default when `None`.
    pub log_filename: Option<String>,
    /// LLM credential, from `<NAME>_API_KEY` or the secrets layer.
    pub api_key: Option<String>,
    /// Unrecognized top-level `config.yml` subtrees, by key.
    extras: BTreeMap<String, serde_yaml::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: "switchboard".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            llm_base_url: "https://api.openai.com/v1".to_string(),
            llm_temperature: 0.2,
            llm_reasoning_effort: ReasoningEffort::default(),
            recursion_limit: 50,
            supervisor_timeout: 120.0,
            specialist_timeout: 60.0,
            formatter_timeout: 30.0,
            llm_request_timeout: 30.0,
            summarization_enabled: false,
            summarization_trigger_tokens: 24_000,
            summarization_keep_messages: 6,
            debug: false,
            debug_prompt_max_length: 2_000,
            debug_show_response: true,
            url_security: UrlSecuritySettings::default(),
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_filename: None,
            api_key: None,
            extras: BTreeMap::new(),
        }
    }
}

/// Keys consumed by the typed fields; everything else is an extras subtree.
const KNOWN_KEYS: &[&str] = &[
    "name",
    "llm_model",
    "llm_base_url",
    "llm_temperature",
    "llm_reasoning_effort",
    "recursion_limit",
    "supervisor_timeout",
    "specialist_timeout",
    "formatter_timeout",
    "llm_request_timeout",
    "summarization_enabled",
    "summarization_trigger_tokens",
    "summarization_keep_messages",
    "debug",
    "debug_prompt_max_length",
    "debug_show_response",
    "url_security",
    "log_level",
    "log_dir",
    "log_filename",
];

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got {:?}", other)),
    }
}

fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

struct Loader<'a> {
    layers: &'a Layers,
    problems: Vec<String>,
}

impl<'a> Loader<'a> {
    fn string(&mut self, key: &str, default: &str) -> String {
        self.layers.get(key).unwrap_or_else(|| default.to_string())
    }

    fn opt_string(&mut self, key: &str) -> Option<String> {
        self.layers.get(key).filter(|s| !s.is_empty())
    }

    fn parsed<T: FromStr>(&mut self, key: &str, default: T) -> T
    where
        T::Err: std::fmt::Display,
    {
        match self.layers.get(key) {
            None => default,
            Some(raw) => match raw.trim().parse() {
                Ok(v) => v,
                Err(e) => {
                    self.problems.push(format!("{}: {} (value {:?})", key, e, raw));
                    default
                }
            },
        }
    }

    fn boolean(&mut self, key: &str, default: bool) -> bool {
        match self.layers.get(key) {
            None => default,
            Some(raw) => match parse_bool(&raw) {
                Ok(v) => v,
                Err(e) => {
                    self.problems.push(format!("{}: {}", key, e));
                    default
                }
            },
        }
    }

    fn list(&mut self, key: &str) -> Vec<String> {
        self.layers.get(key).map(|s| parse_list(&s)).unwrap_or_default()
    }
}

impl Settings {
    /// Builds settings from the merged layers. All malformed values are
    /// collected; any problem fails construction (fail-closed). Missing keys
    /// fall back to field defaults.
    pub fn load(layers: &Layers) -> Result<Self, ConfigurationError> {
        let defaults = Settings::default();
        let mut loader = Loader {
            layers,
            problems: Vec::new(),
        };

        let name = loader.string("NAME", &defaults.name);
        let llm_temperature = loader.parsed("LLM_TEMPERATURE", defaults.llm_temperature);
        if !(0.0..=1.0).contains(&llm_temperature) {
            loader.problems.push(format!(
                "llm_temperature: expected 0.0..=1.0, got {}",
                llm_temperature
            ));
        }
        let recursion_limit: usize = loader.parsed("RECURSION_LIMIT", defaults.recursion_limit);
        if recursion_limit == 0 {
            loader
                .problems
                .push("recursion_limit: must be a positive integer".to_string());
        }

        let settings = Settings {
            llm_model: loader.string("LLM_MODEL", &defaults.llm_model),
            llm_base_url: loader.string("LLM_BASE_URL", &defaults.llm_base_url),
            llm_temperature,
            llm_reasoning_effort: loader
                .parsed("LLM_REASONING_EFFORT", defaults.llm_reasoning_effort),
            recursion_limit,
            supervisor_timeout: loader.parsed("SUPERVISOR_TIMEOUT", defaults.supervisor_timeout),
            specialist_timeout: loader.parsed("SPECIALIST_TIMEOUT", defaults.specialist_timeout),
            formatter_timeout: loader.parsed("FORMATTER_TIMEOUT", defaults.formatter_timeout),
            llm_request_timeout: loader
                .parsed("LLM_REQUEST_TIMEOUT", defaults.llm_request_timeout),
            summarization_enabled: loader
                .boolean("SUMMARIZATION_ENABLED", defaults.summarization_enabled),
            summarization_trigger_tokens: loader.parsed(
                "SUMMARIZATION_TRIGGER_TOKENS",
                defaults.summarization_trigger_tokens,
            ),
            summarization_keep_messages: loader.parsed(
                "SUMMARIZATION_KEEP_MESSAGES",
                defaults.summarization_keep_messages,
            ),
            debug: loader.boolean("DEBUG", defaults.debug),
            debug_prompt_max_length: loader
                .parsed("DEBUG_PROMPT_MAX_LENGTH", defaults.debug_prompt_max_length),
            debug_show_response: loader
                .boolean("DEBUG_SHOW_RESPONSE", defaults.debug_show_response),
            url_security: UrlSecuritySettings {
                enabled: loader.boolean("URL_SECURITY__ENABLED", defaults.url_security.enabled),
                allow_domains: loader.list("URL_SECURITY__ALLOW_DOMAINS"),
                allow_ips: loader.list("URL_SECURITY__ALLOW_IPS"),
                allow_localhost: loader.boolean(
                    "URL_SECURITY__ALLOW_LOCALHOST",
                    defaults.url_security.allow_localhost,
                ),
                log_blocked_attempts: loader.boolean(
                    "URL_SECURITY__LOG_BLOCKED_ATTEMPTS",
                    defaults.url_security.log_blocked_attempts,
                ),
            },
            log_level: loader.string("LOG_LEVEL", &defaults.log_level),
            log_dir: loader.string("LOG_DIR", &defaults.log_dir),
            log_filename: loader.opt_string("LOG_FILENAME"),
            api_key: loader.opt_string(&format!("{}_API_KEY", name.to_uppercase())),
            extras: collect_extras(layers.tree()),
            name,
        };

        if !loader.problems.is_empty() {
            return Err(ConfigurationError {
                problems: loader.problems,
            });
        }

        settings.warn_on_timeout_ordering();
        Ok(settings)
    }

    /// Checks `llm_request_timeout ≤ specialist_timeout ≤ supervisor_timeout`.
    /// Violations are warnings, not errors.
    fn warn_on_timeout_ordering(&self) {
        if self.llm_request_timeout > self.specialist_timeout {
            warn!(
                llm_request_timeout = self.llm_request_timeout,
                specialist_timeout = self.specialist_timeout,
                "llm_request_timeout exceeds specialist_timeout; specialist calls may be cut short"
            );
        }
        if self.specialist_timeout > self.supervisor_timeout {
            warn!(
                specialist_timeout = self.specialist_timeout,
                supervisor_timeout = self.supervisor_timeout,
                "specialist_timeout exceeds supervisor_timeout; specialists may be cut short"
            );
        }
    }

    pub fn supervisor_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.supervisor_timeout)
    }

    pub fn specialist_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.specialist_timeout)
    }

    pub fn formatter_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.formatter_timeout)
    }

    pub fn llm_request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.llm_request_timeout)
    }

    /// The unrecognized config subtree registered under `name`, if any.
    /// Agent-specific options (e.g. a per-agent `recursion_limit`) live here.
    pub fn extras_for(&self, name: &str) -> Option<&serde_yaml::Value> {
        self.extras.get(name)
    }

    /// Per-agent recursion limit override from the agent's extras subtree,
    /// falling back to the global limit.
    pub fn recursion_limit_for(&self, agent_name: &str) -> usize {
        self.extras_for(agent_name)
            .and_then(|v| v.get("recursion_limit"))
            .and_then(serde_yaml::Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(self.recursion_limit)
    }

    /// Environment variable carrying the LLM credential for this chatbot.
    pub fn api_key_env(&self) -> String {
        format!("{}_API_KEY", self.name.to_uppercase())
    }
}

fn collect_extras(tree: &serde_yaml::Value) -> BTreeMap<String, serde_yaml::Value> {
    let mut extras = BTreeMap::new();
    if let serde_yaml::Value::Mapping(map) = tree {
        for (k, v) in map {
            if let Some(key) = k.as_str() {
                if !KNOWN_KEYS.contains(&key) {
                    extras.insert(key.to_string(), v.clone());
                }
            }
        }
    }
    extras
}

static PROCESS_SETTINGS: OnceCell<Settings> = OnceCell::new();

/// Installs the process-scoped settings handle. Returns `Err` with the given
/// settings when a handle was already installed.
pub fn init_process_settings(settings: Settings) -> Result<(), Settings> {
    PROCESS_SETTINGS.set(settings)
}

/// Process-scoped settings for deep call sites. Lazily falls back to defaults
/// when the entrypoint never installed a handle (tests, embedding); the engine
/// core never calls this — it takes settings as a constructor parameter.
pub fn process_settings() -> &'static Settings {
    PROCESS_SETTINGS.get_or_init(|| {
        warn!("process settings accessed before initialization; using defaults");
        Settings::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layers_from_dir(dir: &std::path::Path) -> Layers {
        Layers::load(Some(dir)).unwrap()
    }

    /// **Scenario**: missing config file yields defaults with no error.
    /// (Asserts only on keys no other test sets in the process env.)
    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load(&layers_from_dir(dir.path())).unwrap();
        assert_eq!(s.recursion_limit, 50);
        assert_eq!(s.supervisor_timeout, 120.0);
        assert!(!s.summarization_enabled);
    }

    /// **Scenario**: a type-mismatched value fails construction and the error
    /// names the offending key (fail-closed).
    #[test]
    fn invalid_value_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yml"),
            "recursion_limit: not_a_number\nsupervisor_timeout: also_bad\n",
        )
        .unwrap();
        let err = Settings::load(&layers_from_dir(dir.path())).unwrap_err();
        assert_eq!(err.problems.len(), 2);
        assert!(err.problems.iter().any(|p| p.contains("RECURSION_LIMIT")));
        assert!(err.problems.iter().any(|p| p.contains("SUPERVISOR_TIMEOUT")));
    }

    /// **Scenario**: temperature outside 0.0..=1.0 is rejected.
    #[test]
    fn out_of_range_temperature_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yml"), "llm_temperature: 1.7\n").unwrap();
        let err = Settings::load(&layers_from_dir(dir.path())).unwrap_err();
        assert!(err.problems[0].contains("llm_temperature"));
    }

    /// **Scenario**: unknown top-level keys land in extras and resolve via
    /// `extras_for` / `recursion_limit_for`.
    #[test]
    fn extras_carry_agent_subtrees() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yml"),
            "recursion_limit: 10\nweather_agent:\n  recursion_limit: 100\n  region: eu\n",
        )
        .unwrap();
        let s = Settings::load(&layers_from_dir(dir.path())).unwrap();
        assert_eq!(s.recursion_limit, 10);
        assert_eq!(s.recursion_limit_for("weather_agent"), 100);
        assert_eq!(s.recursion_limit_for("other_agent"), 10);
        let region = s
            .extras_for("weather_agent")
            .and_then(|v| v.get("region"))
            .and_then(serde_yaml::Value::as_str);
        assert_eq!(region, Some("eu"));
    }

    /// **Scenario**: env var overrides the file value for the same option.
    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yml"), "llm_model: from-file\n").unwrap();
        std::env::set_var("LLM_MODEL", "from-env");
        let s = Settings::load(&layers_from_dir(dir.path())).unwrap();
        std::env::remove_var("LLM_MODEL");
        assert_eq!(s.llm_model, "from-env");
    }

    /// **Scenario**: timeout ordering violations load fine (warning only).
    #[test]
    fn timeout_ordering_violation_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yml"),
            "llm_request_timeout: 90\nspecialist_timeout: 10\n",
        )
        .unwrap();
        let s = Settings::load(&layers_from_dir(dir.path())).unwrap();
        assert_eq!(s.llm_request_timeout, 90.0);
    }

    /// **Scenario**: the API key comes from `<NAME>_API_KEY` for the configured name.
    #[test]
    fn api_key_uses_name_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yml"), "name: acme_bot\n").unwrap();
        std::env::set_var("ACME_BOT_API_KEY", "sk-test-123");
        let s = Settings::load(&layers_from_dir(dir.path())).unwrap();
        std::env::remove_var("ACME_BOT_API_KEY");
        assert_eq!(s.name, "acme_bot");
        assert_eq!(s.api_key.as_deref(), Some("sk-test-123"));
        assert_eq!(s.api_key_env(), "ACME_BOT_API_KEY");
    }

    #[test]
    fn reasoning_effort_parses_known_values() {
        assert_eq!(
            "high".parse::<ReasoningEffort>().unwrap(),
            ReasoningEffort::High
        );
        assert!("extreme".parse::<ReasoningEffort>().is_err());
    }
}
