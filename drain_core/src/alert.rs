//! Operator cues. At most one cue is live; a new one replaces the old.
use chrono::{DateTime, Utc};
use drain_traits::{AudioPattern, Cue, NotificationSink, Severity};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Reminder,
    Completion,
    Warning,
    ConnectivityLoss,
}

impl AlertKind {
    /// Every kind maps to its own audio pattern and visual severity.
    pub fn cue(self) -> Cue {
        let (pattern, severity) = match self {
            AlertKind::Reminder => (AudioPattern::DoubleChime, Severity::Info),
            AlertKind::Completion => (AudioPattern::RisingTriad, Severity::Success),
            AlertKind::Warning => (AudioPattern::RapidBeeps, Severity::Warning),
            AlertKind::ConnectivityLoss => (AudioPattern::LowPulse, Severity::Critical),
        };
        Cue { pattern, severity }
    }

    /// Alerts that only make sense while samples are flowing.
    pub fn is_sample_derived(self) -> bool {
        matches!(self, AlertKind::Reminder | AlertKind::Completion)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub message: String,
    pub issued_at: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(kind: AlertKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            issued_at: Utc::now(),
        }
    }

    pub fn reminder() -> Self {
        Self::new(AlertKind::Reminder, "clamp soon: reminder threshold reached")
    }

    pub fn completion() -> Self {
        Self::new(AlertKind::Completion, "drainage complete")
    }

    pub fn connectivity_loss() -> Self {
        Self::new(
            AlertKind::ConnectivityLoss,
            "device disconnected: monitoring paused",
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Shown,
    /// Dropped because connectivity is lost.
    Suppressed,
}

struct ActiveAlert {
    event: AlertEvent,
    dismiss_at_ms: Option<u64>,
}

pub struct AlertDispatcher {
    sink: Box<dyn NotificationSink + Send>,
    active: Option<ActiveAlert>,
    connectivity_lost: bool,
    reminder_dismiss_ms: u64,
}

impl AlertDispatcher {
    pub fn new(sink: Box<dyn NotificationSink + Send>, reminder_dismiss_ms: u64) -> Self {
        Self {
            sink,
            active: None,
            connectivity_lost: false,
            reminder_dismiss_ms,
        }
    }

    /// Show `event`, dismissing whatever cue is currently live.
    pub fn dispatch(&mut self, event: AlertEvent, now_ms: u64) -> DispatchOutcome {
        if self.connectivity_lost && event.kind.is_sample_derived() {
            tracing::debug!(kind = ?event.kind, "alert suppressed while disconnected");
            return DispatchOutcome::Suppressed;
        }
        if event.kind == AlertKind::ConnectivityLoss {
            self.connectivity_lost = true;
        }
        if let Some(prev) = self.active.take() {
            tracing::debug!(kind = ?prev.event.kind, "superseding live alert");
            self.sink.dismiss();
        }
        self.sink.show(event.kind.cue(), &event.message);
        tracing::info!(kind = ?event.kind, message = %event.message, "alert");
        let dismiss_at_ms = (event.kind == AlertKind::Reminder && self.reminder_dismiss_ms > 0)
            .then(|| now_ms.saturating_add(self.reminder_dismiss_ms));
        self.active = Some(ActiveAlert {
            event,
            dismiss_at_ms,
        });
        DispatchOutcome::Shown
    }

    /// Lift the suppression and take down a live connectivity banner.
    pub fn connectivity_restored(&mut self) {
        self.connectivity_lost = false;
        if self
            .active
            .as_ref()
            .is_some_and(|a| a.event.kind == AlertKind::ConnectivityLoss)
        {
            self.active = None;
            self.sink.dismiss();
        }
    }

    /// Run the auto-dismiss one-shot if it is due. Returns true when a cue was taken down.
    pub fn poll_dismiss(&mut self, now_ms: u64) -> bool {
        let due = self
            .active
            .as_ref()
            .and_then(|a| a.dismiss_at_ms)
            .is_some_and(|at| at <= now_ms);
        if due {
            self.active = None;
            self.sink.dismiss();
        }
        due
    }

    pub fn next_dismiss_ms(&self) -> Option<u64> {
        self.active.as_ref().and_then(|a| a.dismiss_at_ms)
    }

    pub fn active(&self) -> Option<&AlertEvent> {
        self.active.as_ref().map(|a| &a.event)
    }

    pub fn is_connectivity_lost(&self) -> bool {
        self.connectivity_lost
    }

    /// Session ended: take down session cues. A connectivity banner stays up,
    /// along with its suppression, until the device is back.
    pub fn clear_session_cues(&mut self) {
        if self
            .active
            .as_ref()
            .is_some_and(|a| a.event.kind != AlertKind::ConnectivityLoss)
        {
            self.active = None;
            self.sink.dismiss();
        }
    }

    /// Teardown: drop the live cue and any pending dismiss.
    pub fn clear(&mut self) {
        if self.active.take().is_some() {
            self.sink.dismiss();
        }
        self.connectivity_lost = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{RecordingSink, SinkCall};
    use std::collections::HashSet;

    fn dispatcher() -> (RecordingSink, AlertDispatcher) {
        let sink = RecordingSink::default();
        let d = AlertDispatcher::new(Box::new(sink.clone()), 10_000);
        (sink, d)
    }

    #[test]
    fn kinds_have_distinct_cues() {
        let kinds = [
            AlertKind::Reminder,
            AlertKind::Completion,
            AlertKind::Warning,
            AlertKind::ConnectivityLoss,
        ];
        let patterns: HashSet<_> = kinds.iter().map(|k| k.cue().pattern).collect();
        let severities: HashSet<_> = kinds.iter().map(|k| k.cue().severity).collect();
        assert_eq!(patterns.len(), kinds.len());
        assert_eq!(severities.len(), kinds.len());
    }

    #[test]
    fn new_cue_dismisses_previous_first() {
        let (sink, mut d) = dispatcher();
        d.dispatch(AlertEvent::reminder(), 0);
        d.dispatch(AlertEvent::completion(), 100);
        let calls = sink.calls();
        assert!(matches!(calls[0], SinkCall::Show(c, _) if c.pattern == AudioPattern::DoubleChime));
        assert_eq!(calls[1], SinkCall::Dismiss);
        assert!(matches!(calls[2], SinkCall::Show(c, _) if c.pattern == AudioPattern::RisingTriad));
        assert_eq!(d.active().map(|a| a.kind), Some(AlertKind::Completion));
    }

    #[test]
    fn reminder_auto_dismisses() {
        let (sink, mut d) = dispatcher();
        d.dispatch(AlertEvent::reminder(), 1_000);
        assert_eq!(d.next_dismiss_ms(), Some(11_000));
        assert!(!d.poll_dismiss(10_999));
        assert!(d.poll_dismiss(11_000));
        assert!(d.active().is_none());
        assert_eq!(sink.calls().last(), Some(&SinkCall::Dismiss));
    }

    #[test]
    fn connectivity_loss_suppresses_sample_alerts_until_restored() {
        let (_sink, mut d) = dispatcher();
        d.dispatch(AlertEvent::connectivity_loss(), 0);
        assert_eq!(
            d.dispatch(AlertEvent::reminder(), 10),
            DispatchOutcome::Suppressed
        );
        assert_eq!(d.active().map(|a| a.kind), Some(AlertKind::ConnectivityLoss));
        d.connectivity_restored();
        assert!(d.active().is_none());
        assert_eq!(d.dispatch(AlertEvent::reminder(), 20), DispatchOutcome::Shown);
    }

    #[test]
    fn clear_drops_pending_dismiss() {
        let (sink, mut d) = dispatcher();
        d.dispatch(AlertEvent::reminder(), 0);
        d.clear();
        assert_eq!(d.next_dismiss_ms(), None);
        let n = sink.calls().len();
        assert!(!d.poll_dismiss(60_000));
        assert_eq!(sink.calls().len(), n);
    }

    #[test]
    fn session_end_keeps_connectivity_banner() {
        let (sink, mut d) = dispatcher();
        d.dispatch(AlertEvent::connectivity_loss(), 0);
        d.clear_session_cues();
        assert_eq!(d.active().map(|a| a.kind), Some(AlertKind::ConnectivityLoss));
        assert!(d.is_connectivity_lost());
        assert!(!sink.calls().contains(&SinkCall::Dismiss));

        d.connectivity_restored();
        d.dispatch(AlertEvent::reminder(), 10);
        d.clear_session_cues();
        assert!(d.active().is_none());
        assert_eq!(sink.calls().last(), Some(&SinkCall::Dismiss));
    }
}
