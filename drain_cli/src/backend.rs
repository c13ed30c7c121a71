//! Device assembly: simulated (default, or trace replay) or HTTP.

use std::path::Path;
use std::sync::Arc;

use drain_config::Config;
use drain_core::error::{DrainError, Result};
use drain_core::{Monitor, MonitorCfg, TracingSink};
use drain_device::{Profile, SimulatedDevice};
use drain_traits::clock::MonotonicClock;
use drain_traits::{Ack, DeviceProbe, DeviceStatus, SessionRecorder, SyncRecord, WeightSource};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone, Debug)]
pub enum Device {
    Sim(SimulatedDevice),
    #[cfg(feature = "http")]
    Http(drain_device::HttpDevice),
}

impl Device {
    pub fn kind(&self) -> &'static str {
        match self {
            Device::Sim(_) => "sim",
            #[cfg(feature = "http")]
            Device::Http(_) => "http",
        }
    }
}

impl WeightSource for Device {
    fn read_kg(&mut self) -> std::result::Result<f64, BoxError> {
        match self {
            Device::Sim(d) => d.read_kg(),
            #[cfg(feature = "http")]
            Device::Http(d) => d.read_kg(),
        }
    }
}

impl DeviceProbe for Device {
    fn status(&mut self) -> std::result::Result<DeviceStatus, BoxError> {
        match self {
            Device::Sim(d) => d.status(),
            #[cfg(feature = "http")]
            Device::Http(d) => d.status(),
        }
    }
}

impl SessionRecorder for Device {
    fn record(&mut self, record: &SyncRecord) -> std::result::Result<Ack, BoxError> {
        match self {
            Device::Sim(d) => d.record(record),
            #[cfg(feature = "http")]
            Device::Http(d) => d.record(record),
        }
    }
}

/// Read an f64 test/demo knob from the environment.
fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Pick the backend: a trace always means simulation; otherwise HTTP when
/// `[device].base_url` is set and the `http` feature is on.
pub fn open(cfg: &Config, trace: Option<&Path>) -> Result<Device> {
    if let Some(path) = trace {
        let rows = drain_config::load_trace_csv(path)
            .map_err(|e| eyre::Report::new(DrainError::Config(e.to_string())))?;
        tracing::info!(rows = rows.len(), path = %path.display(), "replaying weight trace");
        let profile = Profile::Replay(rows.into_iter().map(|r| (r.t_ms, r.mass_kg)).collect());
        return Ok(Device::Sim(sim_device(profile)));
    }

    #[cfg(feature = "http")]
    {
        if let Some(url) = cfg.device.base_url.as_deref() {
            let timeout = std::time::Duration::from_millis(cfg.device.request_timeout_ms);
            let dev = drain_device::HttpDevice::new(url, &cfg.device.device_id, timeout)
                .map_err(|e| eyre::Report::new(DrainError::Config(format!("http client: {e}"))))?;
            tracing::info!(base_url = url, "using HTTP device service");
            return Ok(Device::Http(dev));
        }
    }
    #[cfg(not(feature = "http"))]
    {
        if cfg.device.base_url.is_some() {
            tracing::warn!("built without the http feature; ignoring device.base_url");
        }
    }

    let profile = Profile::Linear {
        start_kg: env_f64("DRAIN_SIM_START_KG").unwrap_or(2.0),
        kg_per_s: env_f64("DRAIN_SIM_KG_PER_S").unwrap_or(0.005),
        floor_kg: 0.0,
    };
    Ok(Device::Sim(sim_device(profile)))
}

fn sim_device(profile: Profile) -> SimulatedDevice {
    let dev = SimulatedDevice::new(profile, Arc::new(MonotonicClock::new()));
    // Test-only nudges for CLI integration tests
    if std::env::var_os("DRAIN_TEST_SIM_OFFLINE").is_some() {
        dev.set_connected(false);
    }
    if let Some(status) = std::env::var("DRAIN_TEST_SIM_REJECT")
        .ok()
        .and_then(|s| s.trim().parse::<u16>().ok())
    {
        dev.set_reject_status(Some(status));
    }
    dev
}

pub fn build_monitor(device: &Device, cfg: &Config) -> Result<Monitor> {
    Monitor::builder()
        .with_device(device.clone())
        .with_sink(TracingSink)
        .with_config(MonitorCfg::from(cfg))
        .try_build()
}
