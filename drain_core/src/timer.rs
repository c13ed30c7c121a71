use std::sync::Arc;
use std::time::Instant;

use drain_traits::Clock;

use crate::state::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Idle,
    Running { anchor: Instant },
    Stopped { elapsed_s: u64 },
}

/// Elapsed-time counter anchored to the clock, not to sample arrival.
///
/// `tick` only publishes the value into `SessionState`; a stalled poll loop
/// therefore never slows the timer down, it only delays the next refresh.
pub struct TreatmentTimer {
    clock: Arc<dyn Clock + Send + Sync>,
    state: TimerState,
}

impl TreatmentTimer {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            clock,
            state: TimerState::Idle,
        }
    }

    /// Start counting. A timer runs at most once per session: calls after
    /// the first are ignored and return `false`.
    pub fn start(&mut self) -> bool {
        if self.state != TimerState::Idle {
            return false;
        }
        self.state = TimerState::Running {
            anchor: self.clock.now(),
        };
        tracing::debug!("treatment timer started");
        true
    }

    /// Freeze the counter and return the final value.
    pub fn stop(&mut self) -> u64 {
        let elapsed_s = self.elapsed_seconds();
        if let TimerState::Running { .. } = self.state {
            self.state = TimerState::Stopped { elapsed_s };
            tracing::debug!(elapsed_s, "treatment timer stopped");
        }
        elapsed_s
    }

    pub fn elapsed_seconds(&self) -> u64 {
        match self.state {
            TimerState::Idle => 0,
            TimerState::Running { anchor } => self.clock.ms_since(anchor) / 1000,
            TimerState::Stopped { elapsed_s } => elapsed_s,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    /// Publish the elapsed time. A running timer whose phase no longer
    /// allows timing is stopped first.
    pub fn tick(&mut self, state: &mut SessionState) {
        if self.is_running() && !state.phase.is_timing() {
            tracing::warn!(phase = %state.phase, "timer running outside a drain phase; stopping");
            self.stop();
        }
        state.elapsed_seconds = self.elapsed_seconds();
    }

    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
    }
}
