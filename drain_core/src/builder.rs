//! Builder for `Monitor`.
//!
//! The weight source, device probe and session recorder are required; the
//! notification sink defaults to `TracingSink` and the clock to
//! `MonotonicClock`. `try_build` validates the runtime config.

use std::sync::Arc;

use drain_traits::clock::{Clock, MonotonicClock};
use drain_traits::{DeviceProbe, NotificationSink, SessionRecorder, WeightSource};

use crate::config::MonitorCfg;
use crate::error::{BuildError, Result};
use crate::monitor::Monitor;
use crate::sinks::TracingSink;

#[derive(Default)]
pub struct MonitorBuilder {
    source: Option<Box<dyn WeightSource + Send>>,
    probe: Option<Box<dyn DeviceProbe + Send>>,
    recorder: Option<Box<dyn SessionRecorder + Send>>,
    sink: Option<Box<dyn NotificationSink + Send>>,
    cfg: MonitorCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

impl MonitorBuilder {
    pub fn with_source(mut self, source: impl WeightSource + Send + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_probe(mut self, probe: impl DeviceProbe + Send + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    pub fn with_recorder(mut self, recorder: impl SessionRecorder + Send + 'static) -> Self {
        self.recorder = Some(Box::new(recorder));
        self
    }

    /// Use one device handle for reads, probes and records.
    pub fn with_device<D>(self, device: D) -> Self
    where
        D: WeightSource + DeviceProbe + SessionRecorder + Clone + Send + 'static,
    {
        self.with_source(device.clone())
            .with_probe(device.clone())
            .with_recorder(device)
    }

    pub fn with_sink(mut self, sink: impl NotificationSink + Send + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn with_config(mut self, cfg: MonitorCfg) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn try_build(self) -> Result<Monitor> {
        let source = self
            .source
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSource))?;
        let probe = self
            .probe
            .ok_or_else(|| eyre::Report::new(BuildError::MissingProbe))?;
        let recorder = self
            .recorder
            .ok_or_else(|| eyre::Report::new(BuildError::MissingRecorder))?;
        validate(&self.cfg)?;
        let sink = self.sink.unwrap_or_else(|| Box::new(TracingSink));
        let clock = self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        Ok(Monitor::new(self.cfg, source, probe, recorder, sink, clock))
    }
}

fn invalid(msg: &'static str) -> Result<()> {
    Err(eyre::Report::new(BuildError::InvalidConfig(msg)))
}

fn validate(cfg: &MonitorCfg) -> Result<()> {
    if cfg.filter.window == 0 {
        return invalid("filter.window must be >= 1");
    }
    let stable = cfg.filter.stable_threshold_kg;
    if !stable.is_finite() || stable <= 0.0 {
        return invalid("filter.stable_threshold_kg must be > 0");
    }
    let p = &cfg.plausibility;
    if !p.min_kg.is_finite() || !p.max_kg.is_finite() || p.min_kg >= p.max_kg {
        return invalid("plausibility.min_kg must be < max_kg");
    }
    let t = &cfg.thresholds;
    let finite = t.reminder_g.is_finite() && t.completion_g.is_finite();
    if !finite || t.reminder_g <= 0.0 || t.reminder_g >= t.completion_g {
        return invalid("thresholds: 0 < reminder_g < completion_g required");
    }
    if !t.zero_kg.is_finite() || t.zero_kg < 0.0 {
        return invalid("thresholds.zero_kg must be >= 0");
    }
    let c = &cfg.cadence;
    if c.poll_ms == 0 || c.tick_ms == 0 || c.probe_ms == 0 {
        return invalid("cadence periods must be >= 1 ms");
    }
    Ok(())
}
