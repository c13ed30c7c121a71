//! Human-readable error descriptions and structured JSON error formatting.

use drain_core::error::{BuildError, DeviceError, DrainError, SyncError, ValidationError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSource => {
                "What happened: No weight source was provided to the monitor.\nLikely causes: The device backend failed to initialize or was not wired into the builder.\nHow to fix: Ensure the device is created successfully and passed via with_device(...) or with_source(...).".to_string()
            }
            BuildError::MissingProbe => {
                "What happened: No connectivity probe was provided to the monitor.\nLikely causes: The device backend was only partially wired into the builder.\nHow to fix: Pass the device via with_device(...) or add with_probe(...).".to_string()
            }
            BuildError::MissingRecorder => {
                "What happened: No session recorder was provided to the monitor.\nLikely causes: The backend client was not wired into the builder.\nHow to fix: Pass the device via with_device(...) or add with_recorder(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/drain_config.toml for a sample."
            ),
        };
    }

    if let Some(de) = err.downcast_ref::<DrainError>() {
        return match de {
            DrainError::Device(DeviceError::Unreachable(msg)) => format!(
                "What happened: The weighing device could not be reached ({msg}).\nLikely causes: Scale powered off, Bluetooth/Wi-Fi link down, or wrong device.base_url.\nHow to fix: Check the scale and its connection, verify [device] in the config, then run `drain health`."
            ),
            DrainError::Device(DeviceError::InvalidReading(msg)) => format!(
                "What happened: The scale returned an unusable reading ({msg}).\nLikely causes: Nothing on the scale, scale not tared, or a reading outside the plausible range.\nHow to fix: Re-seat the bag, tare the scale, or adjust sampling.min_plausible_kg/max_plausible_kg."
            ),
            DrainError::Sync(SyncError::Rejected { status, message }) => format!(
                "What happened: The backend rejected a session record (HTTP {status}: {message}).\nLikely causes: Unknown device id or a malformed record.\nHow to fix: Check device.device_id; the session summary is kept locally for manual reconciliation."
            ),
            DrainError::Sync(SyncError::Transient(msg)) => format!(
                "What happened: The backend was unavailable ({msg}).\nLikely causes: Network outage or backend maintenance.\nHow to fix: Retry later; the session summary is kept locally for manual reconciliation."
            ),
            DrainError::Validation(ValidationError::InvalidInitialWeight(kg)) => format!(
                "What happened: Initial weight {kg} kg was rejected.\nLikely causes: Zero, negative or non-numeric value.\nHow to fix: Enter the full bag weight in kilograms, e.g. `--initial-weight 2.0`."
            ),
            DrainError::Config(msg) => {
                if msg.to_ascii_lowercase().contains("trace csv must have headers") {
                    return "Invalid headers in trace CSV. Expected 't_ms,mass_kg'.".to_string();
                }
                format!(
                    "What happened: Configuration problem ({msg}).\nLikely causes: Missing file, TOML syntax error, or out-of-range values.\nHow to fix: Pass --config with a valid file. See etc/drain_config.toml for a sample."
                )
            }
            // Fallback to generic for other domain errors
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable process exit codes per error family.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 5;
    }
    match err.downcast_ref::<DrainError>() {
        Some(DrainError::Validation(_)) => 2,
        Some(DrainError::Device(_)) => 3,
        Some(DrainError::Sync(_)) => 4,
        Some(DrainError::Config(_)) => 5,
        _ => 1,
    }
}

/// Short machine-readable name for the error family.
pub fn error_reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    match err.downcast_ref::<DrainError>() {
        Some(DrainError::Device(DeviceError::Unreachable(_))) => "DeviceUnreachable",
        Some(DrainError::Device(DeviceError::InvalidReading(_))) => "InvalidReading",
        Some(DrainError::Sync(_)) => "Sync",
        Some(DrainError::Validation(_)) => "Validation",
        Some(DrainError::Config(_)) => "Config",
        Some(DrainError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = error_reason_name(err);
    let msg = humanize(err);
    let obj = match err.downcast_ref::<DrainError>() {
        Some(DrainError::Sync(SyncError::Rejected { status, .. })) => {
            json!({ "reason": reason, "details": { "status": status }, "message": msg })
        }
        _ => json!({ "reason": reason, "message": msg }),
    };
    obj.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DrainError::Validation(ValidationError::NotStarted), 2)]
    #[case(DrainError::Device(DeviceError::Unreachable("x".into())), 3)]
    #[case(DrainError::Sync(SyncError::Transient("x".into())), 4)]
    #[case(DrainError::Config("x".into()), 5)]
    #[case(DrainError::State("x".into()), 1)]
    fn exit_codes_by_family(#[case] e: DrainError, #[case] code: i32) {
        assert_eq!(exit_code_for_error(&eyre::Report::new(e)), code);
    }

    #[test]
    fn build_errors_exit_as_config() {
        let e = eyre::Report::new(BuildError::InvalidConfig("window must be >= 1"));
        assert_eq!(exit_code_for_error(&e), 5);
        assert!(humanize(&e).contains("window must be >= 1"));
    }

    #[test]
    fn rejected_sync_json_carries_status() {
        let e = eyre::Report::new(DrainError::Sync(SyncError::Rejected {
            status: 422,
            message: "bad".into(),
        }));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "Sync");
        assert_eq!(v["details"]["status"], 422);
        assert!(v["message"].as_str().unwrap().contains("HTTP 422"));
    }

    #[test]
    fn untyped_errors_fall_back() {
        let e = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&e), 1);
        assert_eq!(error_reason_name(&e), "Error");
        assert!(humanize(&e).contains("Original: boom"));
    }
}
