//! Simulated weighing device: replays a recorded trace or a synthetic linear
//! drain against a `Clock`, and doubles as an in-memory session recorder.
//!
//! Clones share state, so one instance can be handed to the sampler, the
//! prober and the recorder while tests flip connectivity through another.
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use drain_traits::clock::Clock;
use drain_traits::{Ack, DeviceProbe, DeviceStatus, SessionRecorder, SyncRecord, WeightSource};

use crate::error::DeviceFault;

/// Mass profile over time since the simulator was created.
#[derive(Debug, Clone)]
pub enum Profile {
    /// `(t_ms, mass_kg)` pairs, non-decreasing in time. The latest row at or
    /// before the current offset wins; the first row covers earlier offsets.
    Replay(Vec<(u64, f64)>),
    /// Steady drain from `start_kg` at `kg_per_s`, never below `floor_kg`.
    Linear {
        start_kg: f64,
        kg_per_s: f64,
        floor_kg: f64,
    },
    Fixed(f64),
}

impl Profile {
    fn mass_at(&self, elapsed_ms: u64) -> f64 {
        match self {
            Profile::Replay(rows) => rows
                .iter()
                .take_while(|(t, _)| *t <= elapsed_ms)
                .last()
                .or_else(|| rows.first())
                .map_or(0.0, |(_, kg)| *kg),
            Profile::Linear {
                start_kg,
                kg_per_s,
                floor_kg,
            } => {
                let secs = elapsed_ms as f64 / 1000.0;
                (start_kg - kg_per_s * secs).max(*floor_kg)
            }
            Profile::Fixed(kg) => *kg,
        }
    }
}

#[derive(Debug)]
struct SimState {
    profile: Profile,
    connected: bool,
    fail_reads: bool,
    mass_override: Option<f64>,
    last_seen_at: Option<DateTime<Utc>>,
    reject_status: Option<u16>,
    records: Vec<SyncRecord>,
}

#[derive(Clone)]
pub struct SimulatedDevice {
    state: Arc<Mutex<SimState>>,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
}

impl std::fmt::Debug for SimulatedDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.lock();
        f.debug_struct("SimulatedDevice")
            .field("profile", &st.profile)
            .field("connected", &st.connected)
            .field("records", &st.records.len())
            .finish()
    }
}

impl SimulatedDevice {
    pub fn new(profile: Profile, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let epoch = clock.now();
        Self {
            state: Arc::new(Mutex::new(SimState {
                profile,
                connected: true,
                fail_reads: false,
                mass_override: None,
                last_seen_at: None,
                reject_status: None,
                records: Vec::new(),
            })),
            clock,
            epoch,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Make weight reads fail with a transport error while keeping the probe healthy.
    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Pin the reported mass, bypassing the profile. `None` resumes the profile.
    pub fn set_mass(&self, mass_kg: Option<f64>) {
        self.lock().mass_override = mass_kg;
    }

    /// Make the recorder reject records with the given HTTP status.
    pub fn set_reject_status(&self, status: Option<u16>) {
        self.lock().reject_status = status;
    }

    /// Records accepted so far.
    pub fn records(&self) -> Vec<SyncRecord> {
        self.lock().records.clone()
    }

    pub fn current_mass_kg(&self) -> f64 {
        let elapsed = self.clock.ms_since(self.epoch);
        let st = self.lock();
        st.mass_override
            .unwrap_or_else(|| st.profile.mass_at(elapsed))
    }
}

impl WeightSource for SimulatedDevice {
    fn read_kg(&mut self) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        {
            let st = self.lock();
            if !st.connected {
                return Err(Box::new(DeviceFault::Disconnected));
            }
            if st.fail_reads {
                return Err(Box::new(DeviceFault::Network(
                    "simulated transport failure".into(),
                )));
            }
        }
        let kg = self.current_mass_kg();
        tracing::trace!(mass_kg = kg, "sim weight read");
        Ok(kg)
    }
}

impl DeviceProbe for SimulatedDevice {
    fn status(&mut self) -> Result<DeviceStatus, Box<dyn std::error::Error + Send + Sync>> {
        let mut st = self.lock();
        if st.connected {
            st.last_seen_at = Some(Utc::now());
        }
        Ok(DeviceStatus {
            connected: st.connected,
            last_seen_at: st.last_seen_at,
        })
    }
}

impl SessionRecorder for SimulatedDevice {
    fn record(
        &mut self,
        record: &SyncRecord,
    ) -> Result<Ack, Box<dyn std::error::Error + Send + Sync>> {
        let mut st = self.lock();
        if let Some(status) = st.reject_status {
            return Err(Box::new(DeviceFault::Http {
                status,
                message: "simulated rejection".into(),
            }));
        }
        tracing::debug!(action = record.action.as_str(), "sim session record");
        st.records.push(record.clone());
        Ok(Ack { status: 200 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drain_traits::SyncAction;
    use drain_traits::clock::test_clock::TestClock;

    fn sim(profile: Profile) -> (SimulatedDevice, TestClock) {
        let clock = TestClock::new();
        (SimulatedDevice::new(profile, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn replay_follows_trace_timestamps() {
        let (mut dev, clock) = sim(Profile::Replay(vec![(0, 2.0), (2000, 1.9), (4000, 1.8)]));
        assert!((dev.read_kg().unwrap() - 2.0).abs() < 1e-12);
        clock.advance_ms(1999);
        assert!((dev.read_kg().unwrap() - 2.0).abs() < 1e-12);
        clock.advance_ms(1);
        assert!((dev.read_kg().unwrap() - 1.9).abs() < 1e-12);
        clock.advance_ms(60_000);
        assert!((dev.read_kg().unwrap() - 1.8).abs() < 1e-12);
    }

    #[test]
    fn linear_profile_clamps_at_floor() {
        let (mut dev, clock) = sim(Profile::Linear {
            start_kg: 1.0,
            kg_per_s: 0.1,
            floor_kg: 0.2,
        });
        clock.advance_ms(5000);
        assert!((dev.read_kg().unwrap() - 0.5).abs() < 1e-9);
        clock.advance_ms(60_000);
        assert!((dev.read_kg().unwrap() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn disconnected_device_fails_reads_and_reports_status() {
        let (mut dev, _clock) = sim(Profile::Fixed(1.0));
        let mut probe = dev.clone();
        dev.set_connected(false);
        let err = dev.read_kg().expect_err("disconnected");
        assert!(err.to_string().contains("disconnected"));
        assert!(!probe.status().unwrap().connected);
    }

    #[test]
    fn recorder_keeps_records_or_rejects() {
        let (mut dev, _clock) = sim(Profile::Fixed(1.0));
        let rec = SyncRecord {
            action: SyncAction::Start,
            device_id: "d".into(),
            timestamp: Utc::now(),
            mass_kg: Some(1.0),
            drained_grams: None,
            duration_seconds: None,
        };
        assert_eq!(dev.record(&rec).unwrap().status, 200);
        dev.set_reject_status(Some(422));
        let err = dev.record(&rec).expect_err("rejected");
        assert!(err.to_string().contains("422"));
        assert_eq!(dev.records().len(), 1);
    }
}
