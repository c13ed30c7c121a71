//! Maps `Box<dyn Error>` from trait boundaries to typed `DeviceError` / `SyncError`.
//!
//! The traits in `drain_traits` use `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to our typed enums, with an
//! optional feature-gated path for `drain_device::DeviceFault` downcasting.

use crate::error::{DeviceError, SyncError};

/// Map a weight-read failure to a typed `DeviceError`.
///
/// Malformed payloads are invalid readings (the device answered); everything
/// else means the device could not be reached this cycle.
pub fn map_device_error(e: &(dyn std::error::Error + 'static)) -> DeviceError {
    #[cfg(feature = "device-errors")]
    {
        if let Some(fault) = e.downcast_ref::<drain_device::DeviceFault>() {
            return match fault {
                drain_device::DeviceFault::Decode(msg) => DeviceError::InvalidReading(msg.clone()),
                other => DeviceError::Unreachable(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("malformed") || lower.contains("decode") || lower.contains("not a number") {
        DeviceError::InvalidReading(s)
    } else {
        DeviceError::Unreachable(s)
    }
}

/// Map a recorder failure to a typed `SyncError`: HTTP 4xx is a non-retryable
/// rejection, 5xx and transport errors are transient.
pub fn map_sync_error(e: &(dyn std::error::Error + 'static)) -> SyncError {
    #[cfg(feature = "device-errors")]
    {
        if let Some(fault) = e.downcast_ref::<drain_device::DeviceFault>() {
            return match fault {
                drain_device::DeviceFault::Http { status, message }
                    if (400..500).contains(status) =>
                {
                    SyncError::Rejected {
                        status: *status,
                        message: message.clone(),
                    }
                }
                other => SyncError::Transient(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    match status_in_message(&s) {
        Some(status) if (400..500).contains(&status) => SyncError::Rejected { status, message: s },
        _ => SyncError::Transient(s),
    }
}

/// Find a `status NNN` token in an error message.
fn status_in_message(s: &str) -> Option<u16> {
    let lower = s.to_ascii_lowercase();
    let idx = lower.find("status")?;
    lower[idx + "status".len()..]
        .trim_start_matches(|c: char| c == ' ' || c == ':' || c == '=')
        .get(..3)
        .and_then(|d| d.parse::<u16>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Plain(&'static str);
    impl std::fmt::Display for Plain {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }
    impl std::error::Error for Plain {}

    #[test]
    fn string_fallback_classifies_device_errors() {
        assert!(matches!(
            map_device_error(&Plain("connection refused")),
            DeviceError::Unreachable(_)
        ));
        assert!(matches!(
            map_device_error(&Plain("malformed payload: weight")),
            DeviceError::InvalidReading(_)
        ));
    }

    #[test]
    fn string_fallback_classifies_sync_errors() {
        assert!(matches!(
            map_sync_error(&Plain("http status 422: bad field")),
            SyncError::Rejected { status: 422, .. }
        ));
        assert!(matches!(
            map_sync_error(&Plain("http status 503: busy")),
            SyncError::Transient(_)
        ));
        assert!(matches!(
            map_sync_error(&Plain("connection reset")),
            SyncError::Transient(_)
        ));
    }

    #[cfg(feature = "device-errors")]
    #[test]
    fn typed_faults_downcast_precisely() {
        use drain_device::DeviceFault;
        assert!(matches!(
            map_device_error(&DeviceFault::Decode("x".into())),
            DeviceError::InvalidReading(_)
        ));
        assert!(matches!(
            map_device_error(&DeviceFault::Timeout),
            DeviceError::Unreachable(_)
        ));
        assert!(matches!(
            map_sync_error(&DeviceFault::Http {
                status: 400,
                message: "bad".into()
            }),
            SyncError::Rejected { status: 400, .. }
        ));
        assert!(matches!(
            map_sync_error(&DeviceFault::Http {
                status: 500,
                message: "oops".into()
            }),
            SyncError::Transient(_)
        ));
    }
}
