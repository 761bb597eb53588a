//! CLI support library: engine setup, logging, and terminal rendering for the
//! `switchboard` binary.

pub mod display;
pub mod logging;
pub mod setup;

pub use display::Renderer;
pub use logging::{init_logging, LogMode};
pub use setup::{build_engine, load_settings, settings_summary};
