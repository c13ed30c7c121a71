#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Drainage monitoring engine (device-agnostic).
//!
//! This crate turns a stream of mass readings into a CAPD drainage session.
//! Every external collaborator goes through a `drain_traits` seam:
//! `WeightSource`, `DeviceProbe`, `SessionRecorder` and `NotificationSink`.
//!
//! ## Architecture
//!
//! - **Sampling**: validated readings (`sample`, `source`)
//! - **Filtering**: sliding window, rolling average, stability (`filter`)
//! - **State machine**: pure phase logic with typed transitions (`machine`, `state`)
//! - **Timer**: clock-anchored elapsed time (`timer`)
//! - **Alerts**: one live cue at a time (`alert`)
//! - **Sync**: backend start/stop records with a pending ledger (`sync`)
//! - **Connectivity**: probe cadence and manual reconnect (`reconnect`)
//! - **Scheduling**: `Monitor` runs the periodic tasks; `runner` blocks on it
//!
//! Masses are kilograms at the edges; drained volume is reported in grams.

pub mod alert;
pub mod builder;
pub mod config;
pub mod conversions;
pub mod error;
pub mod fault_map;
pub mod filter;
pub mod machine;
pub mod mocks;
pub mod monitor;
pub mod reconnect;
pub mod runner;
pub mod sample;
pub mod session;
pub mod sinks;
pub mod source;
pub mod state;
pub mod sync;
pub mod timer;
pub mod util;

pub use alert::{AlertDispatcher, AlertEvent, AlertKind, DispatchOutcome};
pub use builder::MonitorBuilder;
pub use config::{AlertCfg, Cadence, FilterCfg, MonitorCfg, Plausibility, ThresholdCfg};
pub use error::{BuildError, DeviceError, DrainError, Result, SyncError, ValidationError};
pub use filter::{FilteredSample, SampleFilter, SampleWindow};
pub use machine::DrainageStateMachine;
pub use monitor::{Command, Monitor, MonitorEvent};
pub use reconnect::{ConnectivityChange, ReconnectionManager};
pub use sample::Sample;
pub use session::SessionSummary;
pub use sinks::TracingSink;
pub use source::SampleSource;
pub use state::{CompletionReason, DrainagePhase, SessionState, Transition, TransitionCause};
pub use sync::{PendingRecord, SessionSync, SyncMeta};
pub use timer::TreatmentTimer;
