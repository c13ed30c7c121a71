//! Blocking driver for a `Monitor`.
//!
//! The loop sleeps until the monitor's next deadline, waking early for
//! operator commands. When the command channel is closed it falls back to
//! `Clock::sleep`, so a simulated clock makes the whole run deterministic.
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;

use crate::error::{DrainError, Result};
use crate::monitor::{Command, Monitor, MonitorEvent};
use crate::session::SessionSummary;

/// Run `monitor` until its session finishes.
///
/// Setting `shutdown` cancels a live session; the call still returns once
/// the cancellation has been processed. Validation failures from commands
/// are reported as `MonitorEvent::Rejected` and do not end the run.
pub fn run<F>(
    monitor: &mut Monitor,
    commands: &xch::Receiver<Command>,
    shutdown: &AtomicBool,
    mut on_event: F,
) -> Result<SessionSummary>
where
    F: FnMut(&MonitorEvent),
{
    monitor.begin();
    let mut commands_open = true;
    let mut cancel_sent = false;

    loop {
        if shutdown.load(Ordering::Relaxed) && !cancel_sent {
            cancel_sent = true;
            tracing::info!("shutdown requested");
            if !monitor.phase().is_terminal() {
                dispatch(monitor, Command::Cancel, &mut on_event);
            }
        }

        for ev in monitor.run_due() {
            on_event(&ev);
            if let MonitorEvent::Finished(summary) = ev {
                return Ok(summary);
            }
        }

        let Some(deadline) = monitor.next_deadline_ms() else {
            return Err(eyre::Report::new(DrainError::State(
                "monitor idle without a finished session".into(),
            )));
        };
        let wait = Duration::from_millis(deadline.saturating_sub(monitor.now_ms()));

        if commands_open {
            match commands.recv_timeout(wait) {
                Ok(cmd) => dispatch(monitor, cmd, &mut on_event),
                Err(xch::RecvTimeoutError::Timeout) => {}
                Err(xch::RecvTimeoutError::Disconnected) => {
                    tracing::debug!("command channel closed");
                    commands_open = false;
                }
            }
        } else {
            monitor.clock().sleep(wait);
        }
    }
}

fn dispatch<F>(monitor: &mut Monitor, cmd: Command, on_event: &mut F)
where
    F: FnMut(&MonitorEvent),
{
    match monitor.handle(cmd) {
        Ok(events) => events.iter().for_each(|ev| on_event(ev)),
        Err(e) => {
            tracing::warn!(?cmd, error = %e, "command rejected");
            on_event(&MonitorEvent::Rejected {
                error: e.to_string(),
            });
        }
    }
}
