//! `From` implementations bridging `drain_config` types to `drain_core` types.

use crate::config::{AlertCfg, Cadence, FilterCfg, MonitorCfg, Plausibility, ThresholdCfg};

// ── FilterCfg / Plausibility ─────────────────────────────────────────────────

impl From<&drain_config::SamplingCfg> for FilterCfg {
    fn from(c: &drain_config::SamplingCfg) -> Self {
        Self {
            window: c.window,
            stable_threshold_kg: c.stable_threshold_kg,
        }
    }
}

impl From<&drain_config::SamplingCfg> for Plausibility {
    fn from(c: &drain_config::SamplingCfg) -> Self {
        Self {
            min_kg: c.min_plausible_kg,
            max_kg: c.max_plausible_kg,
        }
    }
}

// ── ThresholdCfg ─────────────────────────────────────────────────────────────

impl From<&drain_config::ThresholdsCfg> for ThresholdCfg {
    fn from(c: &drain_config::ThresholdsCfg) -> Self {
        Self {
            reminder_g: c.reminder_g,
            completion_g: c.completion_g,
            zero_kg: c.zero_kg,
        }
    }
}

// ── MonitorCfg ───────────────────────────────────────────────────────────────

impl From<&drain_config::Config> for MonitorCfg {
    fn from(c: &drain_config::Config) -> Self {
        Self {
            device_id: c.device.device_id.clone(),
            filter: (&c.sampling).into(),
            plausibility: (&c.sampling).into(),
            thresholds: (&c.thresholds).into(),
            cadence: Cadence {
                poll_ms: c.sampling.poll_ms,
                tick_ms: c.timer.tick_ms,
                probe_ms: c.connectivity.probe_ms,
                manual_min_gap_ms: c.connectivity.manual_min_gap_ms,
            },
            alerts: AlertCfg {
                completion_grace_ms: c.alerts.completion_grace_ms,
                reminder_dismiss_ms: c.alerts.reminder_dismiss_ms,
                failure_warn_after: c.sampling.failure_warn_after,
            },
        }
    }
}
