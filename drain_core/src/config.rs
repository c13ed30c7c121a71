//! Runtime configuration for the monitoring engine.
//!
//! These are the structs used by `Monitor` and its components. They are
//! separate from the TOML-deserialized config in `drain_config`; see
//! `conversions` for the mapping.

/// Sliding window capacity.
pub const WINDOW_CAPACITY: usize = 5;
/// Max consecutive delta (kg) still considered steady flow.
pub const STABLE_THRESHOLD_KG: f64 = 0.05;
/// Cumulative drop (g) that triggers the clamp reminder.
pub const REMINDER_THRESHOLD_G: f64 = 1000.0;
/// Cumulative drop (g) that completes drainage.
pub const COMPLETION_THRESHOLD_G: f64 = 1500.0;
/// Mass (kg) at or below which the bag counts as empty.
pub const ZERO_THRESHOLD_KG: f64 = 0.01;

/// Filter configuration for the sample window.
#[derive(Debug, Clone)]
pub struct FilterCfg {
    /// Window capacity (oldest evicted on overflow).
    pub window: usize,
    /// Every consecutive delta must stay below this for the window to be stable.
    pub stable_threshold_kg: f64,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            window: WINDOW_CAPACITY,
            stable_threshold_kg: STABLE_THRESHOLD_KG,
        }
    }
}

/// Physically plausible reading range; anything outside is discarded.
#[derive(Debug, Clone, Copy)]
pub struct Plausibility {
    pub min_kg: f64,
    pub max_kg: f64,
}

impl Default for Plausibility {
    fn default() -> Self {
        Self {
            min_kg: 0.0,
            max_kg: 20.0,
        }
    }
}

/// Drainage thresholds relative to the captured initial mass.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdCfg {
    pub reminder_g: f64,
    pub completion_g: f64,
    pub zero_kg: f64,
}

impl Default for ThresholdCfg {
    fn default() -> Self {
        Self {
            reminder_g: REMINDER_THRESHOLD_G,
            completion_g: COMPLETION_THRESHOLD_G,
            zero_kg: ZERO_THRESHOLD_KG,
        }
    }
}

/// Periodic task cadences (ms).
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    pub poll_ms: u64,
    pub tick_ms: u64,
    pub probe_ms: u64,
    /// Manual reconnects within this window of the last probe reuse its result.
    pub manual_min_gap_ms: u64,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            poll_ms: 2000,
            tick_ms: 1000,
            probe_ms: 5000,
            manual_min_gap_ms: 1000,
        }
    }
}

/// Alert timing and escalation.
#[derive(Debug, Clone, Copy)]
pub struct AlertCfg {
    /// Delay between the completion alert and the finished callback.
    pub completion_grace_ms: u64,
    /// Reminder banners auto-dismiss after this long. 0 keeps them up.
    pub reminder_dismiss_ms: u64,
    /// Consecutive unreachable polls before a warning. 0 disables.
    pub failure_warn_after: u32,
}

impl Default for AlertCfg {
    fn default() -> Self {
        Self {
            completion_grace_ms: 2000,
            reminder_dismiss_ms: 10_000,
            failure_warn_after: 3,
        }
    }
}

/// Everything a `Monitor` needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct MonitorCfg {
    pub device_id: String,
    pub filter: FilterCfg,
    pub plausibility: Plausibility,
    pub thresholds: ThresholdCfg,
    pub cadence: Cadence,
    pub alerts: AlertCfg,
}

impl Default for MonitorCfg {
    fn default() -> Self {
        Self {
            device_id: "local".to_string(),
            filter: FilterCfg::default(),
            plausibility: Plausibility::default(),
            thresholds: ThresholdCfg::default(),
            cadence: Cadence::default(),
            alerts: AlertCfg::default(),
        }
    }
}
