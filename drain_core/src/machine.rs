//! Pure drainage state machine: no I/O, no clocks, no rendering.
//!
//! All mutation of the phase goes through [`DrainageStateMachine::evaluate`]
//! or one of the operator entry points. Each returns the transitions it
//! performed so callers can drive timers, alerts and sync from them.
//!
//! Drainage is detected against a high-water mark: the highest confirmed mass
//! seen since the last recognised decrease. Decreases and thresholds are only
//! acted on when the filter reports a trend (a stable window or a sustained
//! descent). A lone spike is ignored; a fast steady drain is not. The
//! cumulative drop used for the reminder and completion thresholds is always
//! measured from the captured initial mass.
use crate::config::ThresholdCfg;
use crate::error::ValidationError;
use crate::filter::FilteredSample;
use crate::state::{CompletionReason, DrainagePhase, SessionState, Transition, TransitionCause};
use crate::util::kg_to_grams;

#[derive(Debug, Clone)]
pub struct DrainageStateMachine {
    state: SessionState,
    thresholds: ThresholdCfg,
    stable_threshold_kg: f64,
    last_significant_kg: Option<f64>,
}

impl DrainageStateMachine {
    pub fn new(thresholds: ThresholdCfg, stable_threshold_kg: f64) -> Self {
        Self {
            state: SessionState::new(&thresholds),
            thresholds,
            stable_threshold_kg,
            last_significant_kg: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn phase(&self) -> DrainagePhase {
        self.state.phase
    }

    /// Current high-water mark, if a weight has been captured.
    pub fn last_significant_kg(&self) -> Option<f64> {
        self.last_significant_kg
    }

    /// Feed one filtered sample. Terminal phases ignore samples entirely.
    pub fn evaluate(&mut self, fs: &FilteredSample) -> Vec<Transition> {
        let mut out = Vec::new();
        if self.state.phase.is_terminal() {
            return out;
        }
        let mass = fs.sample.mass_kg;
        self.state.current_mass_kg = mass;
        let empty = mass <= self.thresholds.zero_kg;

        match self.state.phase {
            DrainagePhase::Idle => {
                if !empty {
                    self.capture_initial(mass);
                    self.push(
                        &mut out,
                        DrainagePhase::AwaitingInitialWeight,
                        TransitionCause::InitialWeightCaptured,
                    );
                }
            }
            DrainagePhase::AwaitingInitialWeight => {
                if empty {
                    self.begin_draining(&mut out, mass);
                    self.complete(&mut out, CompletionReason::ZeroMass);
                } else {
                    self.follow_rise(fs);
                    let hwm = self.last_significant_kg.unwrap_or(mass);
                    if fs.is_trend() && mass < hwm - self.stable_threshold_kg {
                        self.begin_draining(&mut out, mass);
                        self.check_thresholds(&mut out);
                    }
                }
            }
            DrainagePhase::Draining | DrainagePhase::ReminderIssued => {
                self.update_drained();
                if empty {
                    self.complete(&mut out, CompletionReason::ZeroMass);
                } else {
                    self.follow_rise(fs);
                    if fs.is_trend() {
                        self.check_thresholds(&mut out);
                    }
                }
            }
            DrainagePhase::Completed | DrainagePhase::Cancelled => {}
        }
        out
    }

    /// Operator-entered initial weight. Allowed until drainage is detected.
    pub fn manual_set_initial_weight(
        &mut self,
        mass_kg: f64,
    ) -> Result<Option<Transition>, ValidationError> {
        if !mass_kg.is_finite() || mass_kg <= 0.0 {
            return Err(ValidationError::InvalidInitialWeight(mass_kg));
        }
        match self.state.phase {
            DrainagePhase::Idle => {
                self.state.current_mass_kg = mass_kg;
                self.capture_initial(mass_kg);
                Ok(Some(self.transition(
                    DrainagePhase::AwaitingInitialWeight,
                    TransitionCause::InitialWeightEntered,
                )))
            }
            DrainagePhase::AwaitingInitialWeight => {
                self.capture_initial(mass_kg);
                Ok(None)
            }
            DrainagePhase::Draining | DrainagePhase::ReminderIssued => {
                Err(ValidationError::DrainageInProgress)
            }
            DrainagePhase::Completed | DrainagePhase::Cancelled => {
                Err(ValidationError::AlreadyFinished)
            }
        }
    }

    /// Operator stop. Mid-drain this completes the session without a
    /// completion cue; before drainage it cancels.
    pub fn manual_stop(&mut self) -> Result<Transition, ValidationError> {
        match self.state.phase {
            DrainagePhase::Idle => Err(ValidationError::NotStarted),
            DrainagePhase::Completed | DrainagePhase::Cancelled => {
                Err(ValidationError::AlreadyFinished)
            }
            DrainagePhase::AwaitingInitialWeight => {
                Ok(self.transition(DrainagePhase::Cancelled, TransitionCause::ManualStop))
            }
            DrainagePhase::Draining | DrainagePhase::ReminderIssued => {
                self.state.completion_reason = Some(CompletionReason::Manual);
                Ok(self.transition(DrainagePhase::Completed, TransitionCause::ManualStop))
            }
        }
    }

    /// Abandon the session from any non-terminal phase.
    pub fn cancel(&mut self) -> Result<Transition, ValidationError> {
        if self.state.phase.is_terminal() {
            return Err(ValidationError::AlreadyFinished);
        }
        Ok(self.transition(DrainagePhase::Cancelled, TransitionCause::OperatorCancel))
    }

    pub fn set_device_connected(&mut self, connected: bool) {
        self.state.device_connected = connected;
    }

    /// Fresh session with the same thresholds. Connectivity is carried over.
    pub fn reset(&mut self) {
        let connected = self.state.device_connected;
        self.state = SessionState::new(&self.thresholds);
        self.state.device_connected = connected;
        self.last_significant_kg = None;
    }

    fn capture_initial(&mut self, mass_kg: f64) {
        self.state.initial_mass_kg = Some(mass_kg);
        self.last_significant_kg = Some(mass_kg);
    }

    /// Raise the high-water mark on a top-up. A single sample above the mark
    /// is taken only when the window is stable; otherwise the previous sample
    /// must already have been above it, so a lone spike never counts.
    fn follow_rise(&mut self, fs: &FilteredSample) {
        let mass_kg = fs.sample.mass_kg;
        let Some(hwm) = self.last_significant_kg else {
            self.last_significant_kg = Some(mass_kg);
            return;
        };
        if mass_kg <= hwm {
            return;
        }
        if fs.is_stable || fs.previous_kg.is_some_and(|p| p > hwm) {
            tracing::debug!(from_kg = hwm, to_kg = mass_kg, "high-water mark raised");
            self.last_significant_kg = Some(mass_kg);
        }
    }

    fn begin_draining(&mut self, out: &mut Vec<Transition>, mass_kg: f64) {
        self.last_significant_kg = Some(mass_kg);
        self.update_drained();
        self.push(out, DrainagePhase::Draining, TransitionCause::DrainageDetected);
    }

    fn update_drained(&mut self) {
        if let Some(initial) = self.state.initial_mass_kg {
            self.state.drained_grams = kg_to_grams(initial - self.state.current_mass_kg).max(0.0);
        }
    }

    fn check_thresholds(&mut self, out: &mut Vec<Transition>) {
        let drop_g = self.state.drained_grams;
        if drop_g >= self.thresholds.completion_g {
            self.complete(out, CompletionReason::Threshold);
        } else if !self.state.reminder_issued && drop_g >= self.thresholds.reminder_g {
            self.state.reminder_issued = true;
            self.push(
                out,
                DrainagePhase::ReminderIssued,
                TransitionCause::ReminderThreshold,
            );
        }
    }

    fn complete(&mut self, out: &mut Vec<Transition>, reason: CompletionReason) {
        self.state.completion_reason = Some(reason);
        let cause = match reason {
            CompletionReason::ZeroMass => TransitionCause::ZeroMass,
            CompletionReason::Threshold => TransitionCause::CompletionThreshold,
            CompletionReason::Manual => TransitionCause::ManualStop,
        };
        self.push(out, DrainagePhase::Completed, cause);
    }

    fn push(&mut self, out: &mut Vec<Transition>, to: DrainagePhase, cause: TransitionCause) {
        let t = self.transition(to, cause);
        out.push(t);
    }

    fn transition(&mut self, to: DrainagePhase, cause: TransitionCause) -> Transition {
        let from = self.state.phase;
        self.state.phase = to;
        tracing::info!(
            %from,
            %to,
            ?cause,
            mass_kg = self.state.current_mass_kg,
            drained_g = self.state.drained_grams,
            "phase transition"
        );
        Transition {
            from,
            to,
            cause,
            mass_kg: self.state.current_mass_kg,
            drained_grams: self.state.drained_grams,
        }
    }
}
