use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use assert_cmd::Command;
use tempfile::tempdir;

// Fast cadences so a whole session finishes in a couple of wall-clock seconds
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[device]
device_id = "cli-test"

[sampling]
poll_ms = 10
window = 2
# generous so scheduler jitter on CI never breaks stability
stable_threshold_kg = 0.5

[timer]
tick_ms = 10

[connectivity]
probe_ms = 50
manual_min_gap_ms = 10

[alerts]
completion_grace_ms = 20
reminder_dismiss_ms = 0
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

// 2.0 kg draining 10 g every 10 ms down to 0.4 kg
fn write_trace(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("trace.csv");
    let mut f = fs::File::create(&path).unwrap();
    writeln!(f, "t_ms,mass_kg").unwrap();
    for i in 0..=160u32 {
        writeln!(f, "{},{:.3}", i * 10, 2.0 - 0.01 * f64::from(i)).unwrap();
    }
    path
}

fn drain_cmd(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("drain_cli").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["health"], 0, "OK", "stdout")]
#[case(&["self-check"], 0, "sim backend", "stdout")]
#[case(&["monitor", "--bogus"], 2, "unexpected argument", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = drain_cmd(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn trace_replay_runs_to_completion() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let trace = write_trace(&dir);

    drain_cmd(&cfg)
        .args(["monitor", "--no-console", "--trace"])
        .arg(&trace)
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("[REMINDER]"))
        .stdout(predicate::str::contains("[COMPLETE]"))
        .stdout(predicate::str::contains("session completed (threshold)"));
}

#[test]
fn rejected_sync_keeps_local_summary() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let trace = write_trace(&dir);

    drain_cmd(&cfg)
        .env("DRAIN_TEST_SIM_REJECT", "422")
        .args(["monitor", "--no-console", "--trace"])
        .arg(&trace)
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("sync: start record not delivered"))
        .stdout(predicate::str::contains("2 record(s) not synced"));
}

#[test]
fn console_cancel_ends_session() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    drain_cmd(&cfg)
        .arg("monitor")
        .write_stdin("bogus\ncancel\n")
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stderr(predicate::str::contains("unknown command: bogus"))
        .stdout(predicate::str::contains("session cancelled"));
}

#[test]
fn invalid_initial_weight_is_rejected_not_fatal() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    drain_cmd(&cfg)
        .args(["monitor", "--initial-weight=-1"])
        .write_stdin("cancel\n")
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("rejected: initial weight must be"));
}

#[test]
fn cli_reports_bad_trace_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let bad_csv = dir.path().join("trace.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "time,weight").unwrap();
    writeln!(f, "0,2.0").unwrap();

    drain_cmd(&cfg)
        .args(["monitor", "--no-console", "--trace"])
        .arg(&bad_csv)
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Invalid headers"));
}

#[rstest]
#[case(&["health"])]
#[case(&["self-check"])]
fn offline_device_exits_with_device_code(#[case] args: &[&str]) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    drain_cmd(&cfg)
        .env("DRAIN_TEST_SIM_OFFLINE", "1")
        .args(args)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("could not be reached"));
}

#[rstest]
#[case("[device]\ndevice_id = \"x\"\n[sampling]\nwindow = 0\n", "sampling.window")]
#[case("[sampling]\npoll_ms = 10\n", "missing field")]
#[case("[device]\ndevice_id = \"x\"\n[thresholds]\nreminder_g = 2000.0\n", "completion_g")]
fn invalid_config_exits_with_config_code(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, toml).unwrap();

    drain_cmd(&path)
        .arg("health")
        .assert()
        .code(5)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.toml");

    drain_cmd(&path)
        .arg("health")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Configuration problem"));
}
