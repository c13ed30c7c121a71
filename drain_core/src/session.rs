use serde::Serialize;

use crate::state::{CompletionReason, DrainagePhase, SessionState};

/// Locally computed record of a finished session. Kept even when backend
/// sync failed so the operator can reconcile it by hand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub device_id: String,
    pub outcome: DrainagePhase,
    pub completion_reason: Option<CompletionReason>,
    pub initial_mass_kg: Option<f64>,
    pub final_mass_kg: f64,
    pub drained_grams: f64,
    pub elapsed_seconds: u64,
    pub reminder_issued: bool,
    /// Start/stop records still waiting on the backend.
    pub sync_pending: usize,
}

impl SessionSummary {
    pub fn from_state(device_id: &str, state: &SessionState, sync_pending: usize) -> Self {
        Self {
            device_id: device_id.to_string(),
            outcome: state.phase,
            completion_reason: state.completion_reason,
            initial_mass_kg: state.initial_mass_kg,
            final_mass_kg: state.current_mass_kg,
            drained_grams: state.drained_grams,
            elapsed_seconds: state.elapsed_seconds,
            reminder_issued: state.reminder_issued,
            sync_pending,
        }
    }

    pub fn needs_reconciliation(&self) -> bool {
        self.sync_pending > 0
    }
}
