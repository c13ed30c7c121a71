//! Cooperative scheduler tying the components together.
//!
//! Three periodic tasks share one thread of control: the weight poll, the
//! timer tick and the connectivity probe. Two one-shots ride along: reminder
//! auto-dismiss and the post-completion grace delay. Nothing here blocks;
//! callers drive it with [`Monitor::run_due`] and sleep until
//! [`Monitor::next_deadline_ms`] (see `runner`).
//!
//! Within one poll cycle the order is fixed: filter, then evaluate, then
//! timer/alerts, then sync.
use std::sync::Arc;
use std::time::Instant;

use drain_traits::clock::Clock;
use drain_traits::{DeviceProbe, NotificationSink, SessionRecorder, SyncAction, WeightSource};
use serde::Serialize;

use crate::alert::{AlertDispatcher, AlertEvent, AlertKind, DispatchOutcome};
use crate::builder::MonitorBuilder;
use crate::config::MonitorCfg;
use crate::error::{DeviceError, ValidationError};
use crate::filter::SampleFilter;
use crate::machine::DrainageStateMachine;
use crate::reconnect::{ConnectivityChange, ReconnectionManager};
use crate::session::SessionSummary;
use crate::source::SampleSource;
use crate::state::{CompletionReason, DrainagePhase, SessionState, Transition};
use crate::sync::{PendingRecord, SessionSync, SyncMeta};
use crate::timer::TreatmentTimer;
use crate::util::advance_deadline;

/// Operator entry points forwarded by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    SetInitialWeight(f64),
    Stop,
    Cancel,
    Reconnect,
}

/// Everything observable that happened during a `run_due` or `handle` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    Phase(Transition),
    Connectivity { connected: bool },
    Alert { kind: AlertKind, message: String },
    SyncFailed { action: &'static str, error: String },
    Rejected { error: String },
    Finished(SessionSummary),
}

pub struct Monitor {
    cfg: MonitorCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    source: SampleSource,
    filter: SampleFilter,
    machine: DrainageStateMachine,
    timer: TreatmentTimer,
    alerts: AlertDispatcher,
    sync: SessionSync,
    reconnect: ReconnectionManager,
    started: bool,
    start_recorded: bool,
    next_poll_ms: u64,
    next_tick_ms: u64,
    next_probe_ms: u64,
    finish_at_ms: Option<u64>,
    finished: bool,
}

impl Monitor {
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::default()
    }

    pub(crate) fn new(
        cfg: MonitorCfg,
        source: Box<dyn WeightSource + Send>,
        probe: Box<dyn DeviceProbe + Send>,
        recorder: Box<dyn SessionRecorder + Send>,
        sink: Box<dyn NotificationSink + Send>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let epoch = clock.now();
        Self {
            source: SampleSource::new(source, cfg.plausibility),
            filter: SampleFilter::new(&cfg.filter),
            machine: DrainageStateMachine::new(cfg.thresholds, cfg.filter.stable_threshold_kg),
            timer: TreatmentTimer::new(Arc::clone(&clock)),
            alerts: AlertDispatcher::new(sink, cfg.alerts.reminder_dismiss_ms),
            sync: SessionSync::new(recorder, cfg.device_id.clone()),
            reconnect: ReconnectionManager::new(probe, cfg.cadence.manual_min_gap_ms),
            started: false,
            start_recorded: false,
            next_poll_ms: 0,
            next_tick_ms: 0,
            next_probe_ms: 0,
            finish_at_ms: None,
            finished: false,
            cfg,
            clock,
            epoch,
        }
    }

    /// Milliseconds since the monitor was built.
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    pub fn config(&self) -> &MonitorCfg {
        &self.cfg
    }

    pub fn state(&self) -> &SessionState {
        self.machine.state()
    }

    pub fn phase(&self) -> DrainagePhase {
        self.machine.phase()
    }

    pub fn machine(&self) -> &DrainageStateMachine {
        &self.machine
    }

    pub fn active_alert(&self) -> Option<&AlertEvent> {
        self.alerts.active()
    }

    pub fn pending_sync(&self) -> &[PendingRecord] {
        self.sync.pending()
    }

    /// Operator-triggered resend of transient sync failures.
    pub fn retry_sync(&mut self) -> usize {
        self.sync.retry_pending()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// True once the finished event has been emitted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Start a session: probe and poll at once, first tick one period out.
    pub fn begin(&mut self) {
        if self.started {
            return;
        }
        let now = self.now_ms();
        self.started = true;
        self.next_probe_ms = now;
        self.next_poll_ms = now;
        self.next_tick_ms = now.saturating_add(self.cfg.cadence.tick_ms);
        tracing::info!(device_id = %self.cfg.device_id, "monitoring session started");
    }

    /// Apply an operator command. Validation failures leave all state untouched.
    pub fn handle(&mut self, cmd: Command) -> Result<Vec<MonitorEvent>, ValidationError> {
        if !self.started {
            return Err(ValidationError::NotStarted);
        }
        let now = self.now_ms();
        let mut events = Vec::new();
        match cmd {
            Command::SetInitialWeight(kg) => {
                if let Some(t) = self.machine.manual_set_initial_weight(kg)? {
                    self.apply_transition(t, now, &mut events);
                }
            }
            Command::Stop => {
                let t = self.machine.manual_stop()?;
                self.apply_transition(t, now, &mut events);
            }
            Command::Cancel => {
                let t = self.machine.cancel()?;
                self.apply_transition(t, now, &mut events);
            }
            Command::Reconnect => {
                let change = self.reconnect.manual_reconnect(now);
                self.apply_connectivity(change, now, &mut events);
            }
        }
        Ok(events)
    }

    /// Run every task whose deadline has passed.
    pub fn run_due(&mut self) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        if !self.started || self.finished {
            return events;
        }
        let now = self.now_ms();
        let cadence = self.cfg.cadence;

        if now >= self.next_probe_ms {
            let change = self.reconnect.probe(now);
            self.apply_connectivity(change, now, &mut events);
            self.next_probe_ms = advance_deadline(self.next_probe_ms, cadence.probe_ms, now);
        }

        if now >= self.next_poll_ms {
            if self.reconnect.is_connected() && !self.machine.phase().is_terminal() {
                self.poll_once(now, &mut events);
            }
            self.next_poll_ms = advance_deadline(self.next_poll_ms, cadence.poll_ms, now);
        }

        if now >= self.next_tick_ms {
            self.timer.tick(self.machine.state_mut());
            self.next_tick_ms = advance_deadline(self.next_tick_ms, cadence.tick_ms, now);
        }

        self.alerts.poll_dismiss(now);

        if self.finish_at_ms.is_some_and(|at| now >= at) {
            self.finish_at_ms = None;
            self.finished = true;
            let summary = self.summary();
            tracing::info!(
                outcome = %summary.outcome,
                drained_g = summary.drained_grams,
                elapsed_s = summary.elapsed_seconds,
                sync_pending = summary.sync_pending,
                "session finished"
            );
            events.push(MonitorEvent::Finished(summary));
        }
        events
    }

    /// Earliest instant (monitor ms) at which `run_due` has work to do.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        if !self.started || self.finished {
            return None;
        }
        [
            Some(self.next_probe_ms),
            Some(self.next_poll_ms),
            Some(self.next_tick_ms),
            self.alerts.next_dismiss_ms(),
            self.finish_at_ms,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary::from_state(
            &self.cfg.device_id,
            self.machine.state(),
            self.sync.pending().len(),
        )
    }

    /// Close out a terminal session and reset for the next one.
    pub fn submit(&mut self) -> Result<SessionSummary, ValidationError> {
        if !self.started {
            return Err(ValidationError::NotStarted);
        }
        if !self.machine.phase().is_terminal() {
            return Err(ValidationError::SessionActive);
        }
        let summary = self.summary();
        self.teardown();
        self.machine.reset();
        self.timer.reset();
        self.filter.reset();
        self.started = false;
        self.start_recorded = false;
        self.finished = false;
        Ok(summary)
    }

    /// Drop live cues and pending one-shots. Safe to call more than once.
    pub fn teardown(&mut self) {
        self.alerts.clear();
        self.finish_at_ms = None;
    }

    fn poll_once(&mut self, now: u64, events: &mut Vec<MonitorEvent>) {
        match self.source.poll(now) {
            Ok(sample) => {
                let filtered = self.filter.ingest(sample);
                for t in self.machine.evaluate(&filtered) {
                    self.apply_transition(t, now, events);
                }
            }
            Err(DeviceError::Unreachable(_)) => {
                let n = self.source.consecutive_failures();
                let warn_after = self.cfg.alerts.failure_warn_after;
                if warn_after > 0 && n == warn_after {
                    let msg = format!("device not responding: {n} consecutive reads failed");
                    self.alert(AlertEvent::new(AlertKind::Warning, msg), now, events);
                }
            }
            Err(DeviceError::InvalidReading(_)) => {}
        }
    }

    fn apply_transition(&mut self, t: Transition, now: u64, events: &mut Vec<MonitorEvent>) {
        events.push(MonitorEvent::Phase(t));
        match t.to {
            DrainagePhase::AwaitingInitialWeight => {
                let meta = SyncMeta {
                    mass_kg: self.machine.state().initial_mass_kg,
                    ..SyncMeta::default()
                };
                self.start_recorded = true;
                let res = self.sync.record_start(meta);
                self.report_sync(SyncAction::Start, res, now, events);
            }
            DrainagePhase::Draining => {
                self.timer.start();
            }
            DrainagePhase::ReminderIssued => {
                self.alert(AlertEvent::reminder(), now, events);
            }
            DrainagePhase::Completed => {
                self.timer.stop();
                self.timer.tick(self.machine.state_mut());
                self.record_stop(now, events);
                if self.machine.state().completion_reason == Some(CompletionReason::Manual) {
                    self.alerts.clear_session_cues();
                    self.finish_at_ms = Some(now);
                } else {
                    self.alert(AlertEvent::completion(), now, events);
                    let grace = self.cfg.alerts.completion_grace_ms;
                    self.finish_at_ms = Some(now.saturating_add(grace));
                }
            }
            DrainagePhase::Cancelled => {
                self.timer.stop();
                self.timer.tick(self.machine.state_mut());
                self.alerts.clear_session_cues();
                self.record_stop(now, events);
                self.finish_at_ms = Some(now);
            }
            DrainagePhase::Idle => {}
        }
    }

    fn record_stop(&mut self, now: u64, events: &mut Vec<MonitorEvent>) {
        if !self.start_recorded {
            return;
        }
        let st = self.machine.state();
        let meta = SyncMeta {
            mass_kg: Some(st.current_mass_kg),
            drained_grams: Some(st.drained_grams),
            duration_seconds: Some(st.elapsed_seconds),
        };
        let res = self.sync.record_stop(meta);
        self.report_sync(SyncAction::Stop, res, now, events);
    }

    fn report_sync<T>(
        &mut self,
        action: SyncAction,
        res: Result<T, crate::error::SyncError>,
        now: u64,
        events: &mut Vec<MonitorEvent>,
    ) {
        if let Err(e) = res {
            events.push(MonitorEvent::SyncFailed {
                action: action.as_str(),
                error: e.to_string(),
            });
            self.alert(
                AlertEvent::new(AlertKind::Warning, "treatment recorded locally; sync failed"),
                now,
                events,
            );
        }
    }

    fn apply_connectivity(
        &mut self,
        change: ConnectivityChange,
        now: u64,
        events: &mut Vec<MonitorEvent>,
    ) {
        match change {
            ConnectivityChange::Unchanged => {}
            ConnectivityChange::Lost => {
                self.machine.set_device_connected(false);
                events.push(MonitorEvent::Connectivity { connected: false });
                self.alert(AlertEvent::connectivity_loss(), now, events);
            }
            ConnectivityChange::Restored => {
                self.machine.set_device_connected(true);
                self.alerts.connectivity_restored();
                // Samples from before the gap say nothing about current flow.
                self.filter.reset();
                self.next_poll_ms = now;
                events.push(MonitorEvent::Connectivity { connected: true });
            }
        }
    }

    fn alert(&mut self, event: AlertEvent, now: u64, events: &mut Vec<MonitorEvent>) {
        let kind = event.kind;
        let message = event.message.clone();
        if self.alerts.dispatch(event, now) == DispatchOutcome::Shown {
            events.push(MonitorEvent::Alert { kind, message });
        }
    }
}
