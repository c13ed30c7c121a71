#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and weight-trace parsing for the drainage monitor.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The trace CSV loader enforces headers and monotonic timestamps so a
//!   recorded session can be replayed through the simulated device.
use serde::Deserialize;

/// Weight trace CSV schema.
///
/// Expected headers:
/// t_ms,mass_kg
///
/// Example:
/// t_ms,mass_kg
/// 0,2.000
/// 2000,1.985
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TraceRow {
    pub t_ms: u64,
    pub mass_kg: f64,
}

#[derive(Debug, Deserialize)]
pub struct DeviceCfg {
    /// Identifier attached to every session record.
    #[serde(alias = "deviceId")]
    pub device_id: String,
    /// Base URL of the device service (HTTP backend only).
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    1500
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplingCfg {
    /// Weight poll cadence (ms).
    pub poll_ms: u64,
    /// Sliding window capacity for averaging and the stability check.
    pub window: usize,
    /// Max consecutive delta (kg) still considered steady flow.
    pub stable_threshold_kg: f64,
    pub min_plausible_kg: f64,
    pub max_plausible_kg: f64,
    /// Consecutive unreachable polls before a warning is raised (0 disables).
    pub failure_warn_after: u32,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self {
            poll_ms: 2000,
            window: 5,
            stable_threshold_kg: 0.05,
            min_plausible_kg: 0.0,
            max_plausible_kg: 20.0,
            failure_warn_after: 3,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ThresholdsCfg {
    /// Cumulative drop (g) that triggers the clamp reminder.
    pub reminder_g: f64,
    /// Cumulative drop (g) that completes drainage.
    pub completion_g: f64,
    /// Mass (kg) at or below which the bag counts as empty.
    pub zero_kg: f64,
}

impl Default for ThresholdsCfg {
    fn default() -> Self {
        Self {
            reminder_g: 1000.0,
            completion_g: 1500.0,
            zero_kg: 0.01,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimerCfg {
    pub tick_ms: u64,
}

impl Default for TimerCfg {
    fn default() -> Self {
        Self { tick_ms: 1000 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConnectivityCfg {
    /// Automatic probe cadence (ms).
    pub probe_ms: u64,
    /// Manual reconnects within this window of the last probe reuse its result.
    pub manual_min_gap_ms: u64,
}

impl Default for ConnectivityCfg {
    fn default() -> Self {
        Self {
            probe_ms: 5000,
            manual_min_gap_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AlertsCfg {
    /// Delay between the completion alert and the finished callback.
    pub completion_grace_ms: u64,
    /// Reminder banners auto-dismiss after this long (0 keeps them up).
    pub reminder_dismiss_ms: u64,
}

impl Default for AlertsCfg {
    fn default() -> Self {
        Self {
            completion_grace_ms: 2000,
            reminder_dismiss_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub device: DeviceCfg,
    #[serde(default)]
    pub sampling: SamplingCfg,
    #[serde(default)]
    pub thresholds: ThresholdsCfg,
    #[serde(default)]
    pub timer: TimerCfg,
    #[serde(default)]
    pub connectivity: ConnectivityCfg,
    #[serde(default)]
    pub alerts: AlertsCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Load a recorded weight trace. Headers must be exactly `t_ms,mass_kg` and
/// timestamps must be non-decreasing.
pub fn load_trace_csv(path: &std::path::Path) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["t_ms", "mass_kg"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "trace CSV must have headers 't_ms,mass_kg', got: {}",
            actual.join(",")
        );
    }

    let mut rows: Vec<TraceRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        let row = match rec {
            Ok(row) => row,
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        };
        if let Some(prev) = rows.last()
            && row.t_ms < prev.t_ms
        {
            eyre::bail!(
                "trace timestamps must be non-decreasing (row {}: {} < {})",
                idx + 2,
                row.t_ms,
                prev.t_ms
            );
        }
        rows.push(row);
    }
    if rows.is_empty() {
        eyre::bail!("trace CSV {:?} contains no samples", path);
    }
    Ok(rows)
}

const MAX_CADENCE_MS: u64 = 60 * 60 * 1000;

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Device
        if self.device.device_id.trim().is_empty() {
            eyre::bail!("device.device_id must not be empty");
        }
        if self.device.request_timeout_ms == 0 {
            eyre::bail!("device.request_timeout_ms must be >= 1");
        }
        if let Some(url) = &self.device.base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            eyre::bail!("device.base_url must start with http:// or https://");
        }

        // Sampling
        let s = &self.sampling;
        if s.poll_ms == 0 {
            eyre::bail!("sampling.poll_ms must be >= 1");
        }
        if s.poll_ms > MAX_CADENCE_MS {
            eyre::bail!("sampling.poll_ms is unreasonably large (>1h)");
        }
        if !(2..=64).contains(&s.window) {
            eyre::bail!("sampling.window must be in [2, 64]");
        }
        if !(s.stable_threshold_kg.is_finite() && s.stable_threshold_kg > 0.0) {
            eyre::bail!("sampling.stable_threshold_kg must be > 0");
        }
        if !(s.min_plausible_kg.is_finite() && s.max_plausible_kg.is_finite()) {
            eyre::bail!("sampling plausibility bounds must be finite");
        }
        if s.min_plausible_kg < 0.0 {
            eyre::bail!("sampling.min_plausible_kg must be >= 0");
        }
        if s.min_plausible_kg >= s.max_plausible_kg {
            eyre::bail!("sampling.min_plausible_kg must be < sampling.max_plausible_kg");
        }

        // Thresholds
        let t = &self.thresholds;
        if !(t.reminder_g.is_finite() && t.reminder_g > 0.0) {
            eyre::bail!("thresholds.reminder_g must be > 0");
        }
        if !(t.completion_g.is_finite() && t.completion_g > 0.0) {
            eyre::bail!("thresholds.completion_g must be > 0");
        }
        if t.completion_g <= t.reminder_g {
            eyre::bail!("thresholds.completion_g must be > thresholds.reminder_g");
        }
        if !(t.zero_kg.is_finite() && t.zero_kg >= 0.0) {
            eyre::bail!("thresholds.zero_kg must be >= 0");
        }

        // Timer / connectivity
        if self.timer.tick_ms == 0 {
            eyre::bail!("timer.tick_ms must be >= 1");
        }
        if self.connectivity.probe_ms == 0 {
            eyre::bail!("connectivity.probe_ms must be >= 1");
        }
        if self.connectivity.probe_ms > MAX_CADENCE_MS {
            eyre::bail!("connectivity.probe_ms is unreasonably large (>1h)");
        }

        // Alerts
        if self.alerts.completion_grace_ms > 60_000 {
            eyre::bail!("alerts.completion_grace_ms is unreasonably large (>1min)");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot}");
        }

        Ok(())
    }
}
