//! Process wiring: layered config → settings → engine.

use std::sync::Arc;

use switchboard::{AgentRegistry, ChatCompletions, Engine, Settings};

/// Loads settings from the working directory's layered sources. Configuration
/// problems are fatal here — the caller prints them and exits nonzero.
pub fn load_settings() -> Result<Settings, Box<dyn std::error::Error + Send + Sync>> {
    let layers = config::Layers::load(None)?;
    let settings = Settings::load(&layers)?;
    Ok(settings)
}

/// Builds the engine for this process. The stock binary starts with an empty
/// registry; chatbots built on the library register their specialists on the
/// registry before constructing the engine.
pub fn build_engine(
    settings: Settings,
    registry: Arc<AgentRegistry>,
) -> Result<Engine, Box<dyn std::error::Error + Send + Sync>> {
    if settings.api_key.is_none() {
        tracing::warn!(
            "no API key found; set {} or add it to secrets.yml",
            settings.api_key_env()
        );
    }
    let client = Arc::new(ChatCompletions::new(
        settings.llm_base_url.clone(),
        settings.api_key.clone(),
    ));
    let prompts = switchboard::prompts::load_or_default(None);
    let engine = Engine::new(settings, prompts, registry, client)?;
    Ok(engine)
}

/// One line per effective setting for `switchboard info`; secrets redacted.
pub fn settings_summary(settings: &Settings) -> String {
    let mut out = String::new();
    let mut push = |k: &str, v: String| out.push_str(&format!("{:<32} {}\n", k, v));
    push("name", settings.name.clone());
    push("llm_model", settings.llm_model.clone());
    push("llm_base_url", settings.llm_base_url.clone());
    push("llm_temperature", settings.llm_temperature.to_string());
    push(
        "llm_reasoning_effort",
        settings.llm_reasoning_effort.as_str().to_string(),
    );
    push("recursion_limit", settings.recursion_limit.to_string());
    push("supervisor_timeout", format!("{}s", settings.supervisor_timeout));
    push("specialist_timeout", format!("{}s", settings.specialist_timeout));
    push("formatter_timeout", format!("{}s", settings.formatter_timeout));
    push(
        "llm_request_timeout",
        format!("{}s", settings.llm_request_timeout),
    );
    push(
        "summarization",
        if settings.summarization_enabled {
            format!(
                "on (trigger {} tokens, keep {})",
                settings.summarization_trigger_tokens, settings.summarization_keep_messages
            )
        } else {
            "off".to_string()
        },
    );
    push("debug", settings.debug.to_string());
    push(
        "url_security",
        if settings.url_security.enabled {
            format!(
                "on ({} domains, {} ranges, localhost {})",
                settings.url_security.allow_domains.len(),
                settings.url_security.allow_ips.len(),
                if settings.url_security.allow_localhost {
                    "allowed"
                } else {
                    "blocked"
                }
            )
        } else {
            "off".to_string()
        },
    );
    push("log_level", settings.log_level.clone());
    push("log_dir", settings.log_dir.clone());
    push(
        "api_key",
        match settings.api_key {
            Some(_) => "***".to_string(),
            None => format!("(unset; reads {})", settings.api_key_env()),
        },
    );
    out
}
