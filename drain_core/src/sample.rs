use crate::config::Plausibility;
use crate::error::DeviceError;

/// One validated mass reading. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub mass_kg: f64,
    /// Milliseconds since the monitor epoch.
    pub timestamp_ms: u64,
}

impl Sample {
    /// Build a sample, rejecting readings that are not finite or fall outside `bounds`.
    pub fn validated(
        mass_kg: f64,
        timestamp_ms: u64,
        bounds: &Plausibility,
    ) -> Result<Self, DeviceError> {
        if !mass_kg.is_finite() {
            return Err(DeviceError::InvalidReading(format!(
                "non-finite mass {mass_kg}"
            )));
        }
        if mass_kg < bounds.min_kg || mass_kg > bounds.max_kg {
            return Err(DeviceError::InvalidReading(format!(
                "mass {mass_kg} kg outside plausible range [{}, {}]",
                bounds.min_kg, bounds.max_kg
            )));
        }
        Ok(Self {
            mass_kg,
            timestamp_ms,
        })
    }
}
