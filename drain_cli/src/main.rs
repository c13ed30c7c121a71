#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `drain` command-line entry point.

mod backend;
mod cli;
mod error_fmt;
mod session;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use drain_config::Config;
use drain_core::error::{DrainError, Result};
use drain_core::{DrainagePhase, Plausibility};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::session::RunOptions;

fn main() {
    // Panic reports only; errors are rendered by error_fmt
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = run(cli) {
        tracing::error!(error = %err, "exiting with error");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(&cli.log_level, &cfg)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Monitor {
            trace,
            initial_weight,
            no_console,
        } => {
            let device = backend::open(&cfg, trace.as_deref())?;
            let mut monitor = backend::build_monitor(&device, &cfg)?;

            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = Arc::clone(&shutdown);
                if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                    tracing::warn!(error = %e, "failed to install Ctrl-C handler");
                }
            }

            let opts = RunOptions {
                initial_weight,
                console: !no_console,
                json: cli.json,
            };
            let summary = session::run_session(&mut monitor, &opts, &shutdown)?;
            if summary.outcome == DrainagePhase::Cancelled {
                tracing::info!("session cancelled by operator");
            }
            Ok(())
        }
        Commands::SelfCheck => {
            let mut device = backend::open(&cfg, None)?;
            let plaus = Plausibility::from(&cfg.sampling);
            let mass_kg = session::self_check(&mut device, &plaus)?;
            if cli.json {
                let report = serde_json::json!({
                    "status": "ok",
                    "backend": device.kind(),
                    "mass_kg": mass_kg,
                });
                println!("{report}");
            } else {
                println!("OK ({} backend, {mass_kg:.3} kg on scale)", device.kind());
            }
            Ok(())
        }
        Commands::Health => {
            let mut device = backend::open(&cfg, None)?;
            session::health(&mut device)?;
            if cli.json {
                println!("{}", serde_json::json!({ "status": "ok" }));
            } else {
                println!("OK");
            }
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        eyre::Report::new(DrainError::Config(format!(
            "read {}: {e}",
            path.display()
        )))
    })?;
    let cfg = drain_config::load_toml(&text).map_err(|e| {
        eyre::Report::new(DrainError::Config(format!(
            "parse {}: {e}",
            path.display()
        )))
    })?;
    cfg.validate()
        .map_err(|e| eyre::Report::new(DrainError::Config(e.to_string())))?;
    Ok(cfg)
}

/// Console logs go to stderr so stdout stays clean for events. An optional
/// JSON-lines file layer follows `[logging]`.
fn init_tracing(cli_level: &str, cfg: &Config) -> Result<()> {
    let level = cfg.logging.level.as_deref().unwrap_or(cli_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let file_layer = match cfg.logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path.file_name().ok_or_else(|| {
                eyre::Report::new(DrainError::Config(format!(
                    "logging.file has no file name: {file}"
                )))
            })?;
            let appender = match cfg.logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_writer(writer))
        }
        None => None,
    };

    // Ignore error if already set (e.g., during tests).
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init();
    Ok(())
}
