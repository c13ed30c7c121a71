//! Session execution: operator console, event output, and one-shot checks.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crossbeam_channel as xch;
use drain_core::error::{DeviceError, DrainError, Result};
use drain_core::{
    AlertKind, Command, CompletionReason, Monitor, MonitorEvent, Plausibility, Sample,
    SessionSummary,
};
use drain_traits::{DeviceProbe, WeightSource};

use crate::backend::Device;

/// Parse one console line into a command. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> std::result::Result<Option<Command>, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(None);
    };
    let cmd = match head.to_ascii_lowercase().as_str() {
        "stop" | "s" => Command::Stop,
        "cancel" | "c" => Command::Cancel,
        "reconnect" | "r" => Command::Reconnect,
        "weight" | "w" => {
            let Some(arg) = parts.next() else {
                return Err("usage: weight <kg>".into());
            };
            let kg: f64 = arg.parse().map_err(|_| format!("not a number: {arg}"))?;
            Command::SetInitialWeight(kg)
        }
        other => {
            return Err(format!(
                "unknown command: {other} (stop|cancel|reconnect|weight <kg>)"
            ));
        }
    };
    if parts.next().is_some() {
        return Err(format!("unexpected arguments after {head}"));
    }
    Ok(Some(cmd))
}

/// Forward stdin lines to the monitor until EOF or the receiver goes away.
fn spawn_console(tx: xch::Sender<Command>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("drain-console".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Ok(Some(cmd)) => {
                        if tx.send(cmd).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(msg) => eprintln!("{msg}"),
                }
            }
            tracing::debug!("console input closed");
        })
        .map(|_| ())
}

fn print_event(ev: &MonitorEvent, json: bool) {
    let mut out = std::io::stdout().lock();
    let res = if json {
        match serde_json::to_string(ev) {
            Ok(line) => writeln!(out, "{line}"),
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize event");
                Ok(())
            }
        }
    } else {
        writeln!(out, "{}", describe(ev))
    };
    if let Err(e) = res {
        tracing::debug!(error = %e, "stdout write failed");
    }
}

fn describe(ev: &MonitorEvent) -> String {
    match ev {
        MonitorEvent::Phase(t) => format!(
            "phase: {} -> {} ({:?}) mass={:.3} kg drained={:.0} g",
            t.from, t.to, t.cause, t.mass_kg, t.drained_grams
        ),
        MonitorEvent::Connectivity { connected: true } => "device: connected".to_string(),
        MonitorEvent::Connectivity { connected: false } => "device: disconnected".to_string(),
        MonitorEvent::Alert { kind, message } => {
            let tag = match kind {
                AlertKind::Reminder => "REMINDER",
                AlertKind::Completion => "COMPLETE",
                AlertKind::Warning => "WARNING",
                AlertKind::ConnectivityLoss => "OFFLINE",
            };
            format!("[{tag}] {message}")
        }
        MonitorEvent::SyncFailed { action, error } => {
            format!("sync: {action} record not delivered: {error}")
        }
        MonitorEvent::Rejected { error } => format!("rejected: {error}"),
        MonitorEvent::Finished(s) => {
            let reason = match s.completion_reason {
                Some(CompletionReason::Threshold) => " (threshold)",
                Some(CompletionReason::ZeroMass) => " (bag empty)",
                Some(CompletionReason::Manual) => " (manual stop)",
                None => "",
            };
            let mut line = format!(
                "session {}{reason}: drained {:.0} g in {} s, final mass {:.3} kg",
                s.outcome, s.drained_grams, s.elapsed_seconds, s.final_mass_kg
            );
            if s.needs_reconciliation() {
                line.push_str(&format!(
                    "; {} record(s) not synced, reconcile manually",
                    s.sync_pending
                ));
            }
            line
        }
    }
}

pub struct RunOptions {
    pub initial_weight: Option<f64>,
    pub console: bool,
    pub json: bool,
}

/// Run one monitored session to its end.
pub fn run_session(
    monitor: &mut Monitor,
    opts: &RunOptions,
    shutdown: &Arc<AtomicBool>,
) -> Result<SessionSummary> {
    let (tx, rx) = xch::unbounded::<Command>();
    if let Some(kg) = opts.initial_weight {
        // Queued before `begin`; handled on the first loop turn
        let _ = tx.send(Command::SetInitialWeight(kg));
    }
    if opts.console {
        spawn_console(tx.clone())
            .map_err(|e| eyre::Report::new(DrainError::State(format!("console thread: {e}"))))?;
    }
    drop(tx);

    let json = opts.json;
    let summary = drain_core::runner::run(monitor, &rx, shutdown, |ev| print_event(ev, json))?;
    monitor.teardown();
    tracing::info!(
        outcome = %summary.outcome,
        drained_g = summary.drained_grams,
        elapsed_s = summary.elapsed_seconds,
        sync_pending = summary.sync_pending,
        "monitoring finished"
    );
    Ok(summary)
}

/// Probe the device and take one plausibility-checked reading.
pub fn self_check(device: &mut Device, plaus: &Plausibility) -> Result<f64> {
    let status = probe(device)?;
    let raw = device.read_kg().map_err(|e| {
        eyre::Report::new(DrainError::Device(drain_core::fault_map::map_device_error(
            e.as_ref(),
        )))
    })?;
    let sample =
        Sample::validated(raw, 0, plaus).map_err(|e| eyre::Report::new(DrainError::Device(e)))?;
    tracing::info!(
        kind = device.kind(),
        last_seen = ?status.last_seen_at,
        mass_kg = sample.mass_kg,
        "self-check ok"
    );
    Ok(sample.mass_kg)
}

/// Connectivity probe only.
pub fn health(device: &mut Device) -> Result<()> {
    probe(device).map(|_| ())
}

fn probe(device: &mut Device) -> Result<drain_traits::DeviceStatus> {
    let status = device.status().map_err(|e| {
        eyre::Report::new(DrainError::Device(drain_core::fault_map::map_device_error(
            e.as_ref(),
        )))
    })?;
    if !status.connected {
        return Err(eyre::Report::new(DrainError::Device(DeviceError::Unreachable(
            "device reports disconnected".into(),
        ))));
    }
    Ok(status)
}
