//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "drain", version, about = "CAPD drainage monitor")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/drain_config.toml")]
    pub config: PathBuf,

    /// Print events and errors as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Monitor one drainage session until it completes or is cancelled
    Monitor {
        /// Replay a recorded weight trace (CSV with headers `t_ms,mass_kg`)
        #[arg(long, value_name = "FILE")]
        trace: Option<PathBuf>,
        /// Enter the initial bag weight instead of waiting for the scale
        #[arg(long, value_name = "KG")]
        initial_weight: Option<f64>,
        /// Ignore stdin; only Ctrl-C can end the session early
        #[arg(long, action = ArgAction::SetTrue)]
        no_console: bool,
    },
    /// One device probe and one weight read
    SelfCheck,
    /// Health check for operational monitoring
    Health,
}
