//! Boundary traits between the drainage monitor and its external collaborators.
//!
//! Implementations live elsewhere (`drain_device` for HTTP and simulation,
//! test doubles in the test suites). Errors crossing these traits are boxed;
//! `drain_core` maps them to its typed taxonomy.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

use chrono::{DateTime, Utc};

/// Latest mass reading from the weighing device.
pub trait WeightSource {
    /// Return the current mass in kilograms. Payload validation happens upstream.
    fn read_kg(&mut self) -> Result<f64, Box<dyn std::error::Error + Send + Sync>>;
}

/// Connectivity check against the device-status endpoint.
pub trait DeviceProbe {
    fn status(&mut self) -> Result<DeviceStatus, Box<dyn std::error::Error + Send + Sync>>;
}

/// Backend persistence of session start/stop events.
pub trait SessionRecorder {
    fn record(
        &mut self,
        record: &SyncRecord,
    ) -> Result<Ack, Box<dyn std::error::Error + Send + Sync>>;
}

/// Visual banner + audio cue capability. At most one cue is shown at a time;
/// callers dismiss the previous cue before showing another.
pub trait NotificationSink {
    fn show(&mut self, cue: Cue, message: &str);
    fn dismiss(&mut self);
}

impl<T: WeightSource + ?Sized> WeightSource for Box<T> {
    fn read_kg(&mut self) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_kg()
    }
}

impl<T: DeviceProbe + ?Sized> DeviceProbe for Box<T> {
    fn status(&mut self) -> Result<DeviceStatus, Box<dyn std::error::Error + Send + Sync>> {
        (**self).status()
    }
}

impl<T: SessionRecorder + ?Sized> SessionRecorder for Box<T> {
    fn record(
        &mut self,
        record: &SyncRecord,
    ) -> Result<Ack, Box<dyn std::error::Error + Send + Sync>> {
        (**self).record(record)
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for Box<T> {
    fn show(&mut self, cue: Cue, message: &str) {
        (**self).show(cue, message);
    }
    fn dismiss(&mut self) {
        (**self).dismiss();
    }
}

/// Response of the device-status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStatus {
    pub connected: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Start,
    Stop,
}

impl SyncAction {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncAction::Start => "start",
            SyncAction::Stop => "stop",
        }
    }
}

/// Payload recorded by the backend on monitoring start/stop. Write-once per transition.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRecord {
    pub action: SyncAction,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    /// Initial mass on start, final mass on stop.
    pub mass_kg: Option<f64>,
    pub drained_grams: Option<f64>,
    pub duration_seconds: Option<u64>,
}

/// Backend acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub status: u16,
}

/// Distinct audio pattern per alert kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioPattern {
    /// Two soft chimes: "clamp soon".
    DoubleChime,
    /// Rising three-tone: treatment complete.
    RisingTriad,
    /// Short repeated beeps.
    RapidBeeps,
    /// Slow low pulse, repeats until dismissed.
    LowPulse,
}

/// Distinct visual severity per alert kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cue {
    pub pattern: AudioPattern,
    pub severity: Severity,
}
