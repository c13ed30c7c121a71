use drain_traits::WeightSource;

use crate::config::Plausibility;
use crate::error::DeviceError;
use crate::fault_map::map_device_error;
use crate::sample::Sample;

/// Wraps a `WeightSource`, validating readings and counting consecutive outages.
pub struct SampleSource {
    inner: Box<dyn WeightSource + Send>,
    bounds: Plausibility,
    consecutive_failures: u32,
}

impl SampleSource {
    pub fn new(inner: Box<dyn WeightSource + Send>, bounds: Plausibility) -> Self {
        Self {
            inner,
            bounds,
            consecutive_failures: 0,
        }
    }

    /// Read once and stamp the result with `timestamp_ms`.
    ///
    /// Unreachable devices bump the failure counter; any successful read
    /// clears it. Implausible readings are dropped without touching it.
    pub fn poll(&mut self, timestamp_ms: u64) -> Result<Sample, DeviceError> {
        let raw = match self.inner.read_kg() {
            Ok(kg) => kg,
            Err(e) => {
                let mapped = map_device_error(e.as_ref());
                if matches!(mapped, DeviceError::Unreachable(_)) {
                    self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                    tracing::warn!(
                        error = %mapped,
                        consecutive = self.consecutive_failures,
                        "weight poll failed"
                    );
                } else {
                    tracing::warn!(error = %mapped, "discarding weight payload");
                }
                return Err(mapped);
            }
        };
        self.consecutive_failures = 0;
        Sample::validated(raw, timestamp_ms, &self.bounds).inspect_err(|e| {
            tracing::warn!(error = %e, "discarding implausible reading");
        })
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
