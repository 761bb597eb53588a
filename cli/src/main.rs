//! The `switchboard` binary: terminal chat, web server, and listings.
//!
//! Subcommands: `chat` (interactive terminal session), `web` (WebSocket
//! server + HTML client), `agents` (registered agents), `info` (effective
//! configuration). No subcommand prints the help panel.

mod repl;

use std::sync::Arc;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};

use cli::{build_engine, init_logging, load_settings, settings_summary, LogMode};
use switchboard::AgentRegistry;

#[derive(Parser, Debug)]
#[command(name = "switchboard")]
#[command(version)]
#[command(about = "Switchboard — route queries through specialist agents")]
struct Args {
    #[command(subcommand)]
    cmd: Option<Command>,

    /// -v: DEBUG logs; -vv: DEBUG plus prompt debugging
    #[arg(short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Explicit log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Log file path (overrides the timestamped default)
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<String>,

    /// Enable prompt debugging (logs prompts and tool arguments)
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Interactive terminal session: one turn per input line
    Chat,
    /// WebSocket server with the embedded HTML client
    Web {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// List registered agents (name, description, tool count)
    Agents,
    /// Print the effective configuration
    Info,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let Some(cmd) = args.cmd.clone() else {
        // Help panel, exit 0.
        let _ = Args::command().print_help();
        println!();
        return;
    };

    let mut settings = match load_settings() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("switchboard: {}", e);
            std::process::exit(1);
        }
    };

    let level = resolve_level(&args, &settings.log_level);
    if args.debug || args.verbose >= 2 {
        settings.debug = true;
    }

    let mode = match cmd {
        // 12-factor in web mode: stderr only, no files.
        Command::Web { .. } => LogMode::Stderr,
        _ => LogMode::File {
            dir: settings.log_dir.clone(),
            filename: args
                .log_file
                .clone()
                .or_else(|| settings.log_filename.clone()),
        },
    };
    let _log_guard = match init_logging(mode, &level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("switchboard: logging setup failed: {}", e);
            std::process::exit(1);
        }
    };

    // Process-scoped handle for call sites outside the engine's wiring.
    let _ = switchboard::settings::init_process_settings(settings.clone());

    let registry = Arc::new(AgentRegistry::new());
    let engine = match build_engine(settings, Arc::clone(&registry)) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            eprintln!("switchboard: {}", e);
            std::process::exit(1);
        }
    };

    match cmd {
        Command::Chat => {
            if let Err(e) = repl::run_chat_loop(&engine).await {
                eprintln!("switchboard: {}", e);
                std::process::exit(1);
            }
        }
        Command::Web { host, port } => {
            let addr = format!("{}:{}", host, port);
            if let Err(e) = serve::run_serve_with_engine(engine, Some(&addr), false).await {
                eprintln!("switchboard: {}", e);
                std::process::exit(1);
            }
        }
        Command::Agents => {
            let agents = registry.get_all();
            if agents.is_empty() {
                println!("no agents registered");
            }
            for agent in agents {
                println!(
                    "{:<20} {:<48} {} tools",
                    agent.name,
                    agent.short_description(),
                    agent.tools.len()
                );
            }
        }
        Command::Info => {
            print!("{}", settings_summary(engine.settings()));
        }
    }
}

/// Flag precedence: -q beats -v beats --log-level beats the config value.
fn resolve_level(args: &Args, configured: &str) -> String {
    if args.quiet {
        "warn".to_string()
    } else if args.verbose >= 1 {
        "debug".to_string()
    } else if let Some(ref level) = args.log_level {
        level.clone()
    } else {
        configured.to_string()
    }
}
