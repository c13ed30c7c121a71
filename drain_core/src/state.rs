//! Session aggregate and the typed transition events emitted by the state machine.
use serde::Serialize;

use crate::config::ThresholdCfg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainagePhase {
    Idle,
    AwaitingInitialWeight,
    Draining,
    ReminderIssued,
    Completed,
    Cancelled,
}

impl DrainagePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, DrainagePhase::Completed | DrainagePhase::Cancelled)
    }

    /// Phases during which the treatment timer may advance.
    pub fn is_timing(self) -> bool {
        matches!(self, DrainagePhase::Draining | DrainagePhase::ReminderIssued)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DrainagePhase::Idle => "idle",
            DrainagePhase::AwaitingInitialWeight => "awaiting_initial_weight",
            DrainagePhase::Draining => "draining",
            DrainagePhase::ReminderIssued => "reminder_issued",
            DrainagePhase::Completed => "completed",
            DrainagePhase::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for DrainagePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session reached `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// Cumulative drop reached the completion threshold.
    Threshold,
    /// Bag read empty.
    ZeroMass,
    /// Operator stopped monitoring mid-drain.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub phase: DrainagePhase,
    pub initial_mass_kg: Option<f64>,
    pub current_mass_kg: f64,
    pub drained_grams: f64,
    pub elapsed_seconds: u64,
    pub reminder_threshold_grams: f64,
    pub completion_threshold_grams: f64,
    pub device_connected: bool,
    pub reminder_issued: bool,
    pub completion_reason: Option<CompletionReason>,
}

impl SessionState {
    pub fn new(thresholds: &ThresholdCfg) -> Self {
        Self {
            phase: DrainagePhase::Idle,
            initial_mass_kg: None,
            current_mass_kg: 0.0,
            drained_grams: 0.0,
            elapsed_seconds: 0,
            reminder_threshold_grams: thresholds.reminder_g,
            completion_threshold_grams: thresholds.completion_g,
            device_connected: true,
            reminder_issued: false,
            completion_reason: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    InitialWeightCaptured,
    InitialWeightEntered,
    DrainageDetected,
    ReminderThreshold,
    CompletionThreshold,
    ZeroMass,
    ManualStop,
    OperatorCancel,
}

/// One phase change. The state machine emits these; timer, alerts and sync react to them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transition {
    pub from: DrainagePhase,
    pub to: DrainagePhase,
    pub cause: TransitionCause,
    pub mass_kg: f64,
    pub drained_grams: f64,
}
