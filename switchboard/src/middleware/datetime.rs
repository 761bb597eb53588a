//! Datetime context: a fresh temporal block on every model call.
//!
//! The block sits between LLM-inert sentinel comments at the *end* of the
//! system message; the static prefix stays byte-stable so providers that cache
//! system-message prefixes keep their cache hits. Re-injection strips the old
//! block first, so a conversation never carries two.
//!
//! Formatting is cached for a short TTL. The cache race is benign (the value
//! is idempotent within a second), so a plain mutex with no double-checked
//! ceremony is enough.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{Datelike, Duration as ChronoDuration, TimeZone, Utc};

use super::Middleware;
use crate::llm::ModelRequest;

/// Sentinels delimiting the injected block.
pub const DATETIME_START: &str = "<!-- datetime:start -->";
pub const DATETIME_END: &str = "<!-- datetime:end -->";

/// Cache TTL for the formatted block: hot enough to amortize the several
/// injections within one turn, stale by the time the next turn needs a fresh
/// timestamp.
const CACHE_TTL: Duration = Duration::from_secs(1);

/// How much temporal context to inject.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatetimeMode {
    /// Current date/time only (~15 tokens). Default for specialists.
    Minimal,
    /// Current time plus a reference-date table and a phrase guide. Supervisor.
    Full,
}

pub struct DatetimeContext {
    mode: DatetimeMode,
    phrase_guide: String,
    cache: Mutex<Option<(Instant, String)>>,
}

impl DatetimeContext {
    pub fn minimal() -> Self {
        Self {
            mode: DatetimeMode::Minimal,
            phrase_guide: String::new(),
            cache: Mutex::new(None),
        }
    }

    pub fn full(phrase_guide: String) -> Self {
        Self {
            mode: DatetimeMode::Full,
            phrase_guide,
            cache: Mutex::new(None),
        }
    }

    fn block(&self) -> String {
        if let Some((at, cached)) = self.cache.lock().expect("datetime cache poisoned").as_ref() {
            if at.elapsed() < CACHE_TTL {
                return cached.clone();
            }
        }
        let fresh = self.format_block(Utc::now());
        *self.cache.lock().expect("datetime cache poisoned") = Some((Instant::now(), fresh.clone()));
        fresh
    }

    fn format_block(&self, now: chrono::DateTime<Utc>) -> String {
        let mut out = String::new();
        out.push_str(DATETIME_START);
        out.push('\n');
        out.push_str(&format!(
            "Current time: {} ({})\n",
            now.format("%A, %B %e, %Y %H:%M UTC"),
            now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        ));
        if self.mode == DatetimeMode::Full {
            let midnight = Utc
                .with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
                .single()
                .unwrap_or(now);
            let start_of_week =
                midnight - ChronoDuration::days(now.weekday().num_days_from_monday() as i64);
            let start_of_month = Utc
                .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
                .single()
                .unwrap_or(midnight);
            let (ly, lm) = if now.month() == 1 {
                (now.year() - 1, 12)
            } else {
                (now.year(), now.month() - 1)
            };
            let start_of_last_month = Utc
                .with_ymd_and_hms(ly, lm, 1, 0, 0, 0)
                .single()
                .unwrap_or(start_of_month);

            let iso = |t: chrono::DateTime<Utc>| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
            out.push_str("Reference dates:\n");
            out.push_str(&format!(
                "- Yesterday: {}\n",
                iso(midnight - ChronoDuration::days(1))
            ));
            out.push_str(&format!("- Last 24h: {}\n", iso(now - ChronoDuration::hours(24))));
            out.push_str(&format!(
                "- Last 7 days: {}\n",
                iso(now - ChronoDuration::days(7))
            ));
            out.push_str(&format!(
                "- Last 30 days: {}\n",
                iso(now - ChronoDuration::days(30))
            ));
            out.push_str(&format!("- Start of week: {}\n", iso(start_of_week)));
            out.push_str(&format!("- Start of month: {}\n", iso(start_of_month)));
            out.push_str(&format!(
                "- Start of last month: {}\n",
                iso(start_of_last_month)
            ));
            if !self.phrase_guide.is_empty() {
                out.push_str(&self.phrase_guide);
                if !self.phrase_guide.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
        out.push_str(DATETIME_END);
        out
    }
}

/// Removes an existing delimited block (and surrounding blank padding).
fn strip_block(text: &str) -> String {
    let Some(start) = text.find(DATETIME_START) else {
        return text.to_string();
    };
    let Some(end_rel) = text[start..].find(DATETIME_END) else {
        return text.to_string();
    };
    let end = start + end_rel + DATETIME_END.len();
    let mut out = String::with_capacity(text.len());
    out.push_str(text[..start].trim_end());
    out.push_str(text[end..].trim_end());
    out
}

impl Middleware for DatetimeContext {
    fn before_model(&self, request: &mut ModelRequest) {
        let existing = request.system.take().unwrap_or_default();
        let stripped = strip_block(&existing);
        let block = self.block();
        let system = if stripped.is_empty() {
            block
        } else {
            format!("{}\n\n{}", stripped, block)
        };
        request.system = Some(system);
    }
}
