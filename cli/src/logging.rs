//! Logging initialization for the two process modes.
//!
//! Chat (and the one-shot listing commands) log to a timestamped file under
//! `log_dir` so the terminal stays clean for user-facing text. Web mode logs
//! to stderr only and writes no files.

use tracing_subscriber::EnvFilter;

/// Where application logs go.
pub enum LogMode {
    /// Timestamped file under `dir` (chat mode). `filename` overrides the
    /// generated name.
    File {
        dir: String,
        filename: Option<String>,
    },
    /// Standard error only (web mode).
    Stderr,
}

/// Builds the default log file name: `<name>-YYYYmmdd-HHMMSS.log`.
pub fn default_log_filename(name: &str) -> String {
    format!(
        "{}-{}.log",
        name,
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    )
}

/// Initializes the global subscriber. Returns a guard that must be held for
/// the life of the process when logging to a file (dropping it stops the
/// background writer).
pub fn init_logging(
    mode: LogMode,
    level: &str,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    match mode {
        LogMode::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
        LogMode::File { dir, filename } => {
            std::fs::create_dir_all(&dir)?;
            let filename = filename.unwrap_or_else(|| default_log_filename("switchboard"));
            let appender = tracing_appender::rolling::never(&dir, filename);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
    }
}
