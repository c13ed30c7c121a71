#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
//! Concrete collaborators for the drainage monitor: the HTTP device service
//! client and a simulated device for tests and dry runs.
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod sim;
pub mod util;

pub use error::DeviceFault;
#[cfg(feature = "http")]
pub use http::HttpDevice;
pub use sim::{Profile, SimulatedDevice};
