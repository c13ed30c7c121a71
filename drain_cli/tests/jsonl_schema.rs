use serde_json::Value;
use std::fs;
use std::io::Write;
use assert_cmd::Command;
use tempfile::tempdir;

fn setup(dir: &tempfile::TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        r#"
[device]
device_id = "jsonl"

[sampling]
poll_ms = 10
window = 2
stable_threshold_kg = 0.5

[timer]
tick_ms = 10

[connectivity]
probe_ms = 50

[alerts]
completion_grace_ms = 20
"#,
    )
    .unwrap();

    // Full bag that empties: zero-mass completion
    let trace = dir.path().join("trace.csv");
    let mut f = fs::File::create(&trace).unwrap();
    writeln!(f, "t_ms,mass_kg").unwrap();
    for i in 0..=40u32 {
        writeln!(f, "{},{:.3}", i * 10, (1.0 - 0.025 * f64::from(i)).max(0.0)).unwrap();
    }
    (cfg, trace)
}

#[test]
fn monitor_json_lines_follow_event_schema() {
    let dir = tempdir().unwrap();
    let (cfg, trace) = setup(&dir);

    let out = Command::cargo_bin("drain_cli")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .args(["monitor", "--no-console", "--trace"])
        .arg(&trace)
        .timeout(std::time::Duration::from_secs(30))
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let events: Vec<Value> = String::from_utf8(out.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("bad line {l}: {e}")))
        .collect();
    assert!(!events.is_empty());
    for ev in &events {
        let tag = ev["event"].as_str().expect("event tag");
        assert!(
            matches!(
                tag,
                "phase" | "connectivity" | "alert" | "sync_failed" | "rejected" | "finished"
            ),
            "unexpected tag {tag}"
        );
        if tag == "phase" {
            for key in ["from", "to", "cause", "mass_kg", "drained_grams"] {
                assert!(ev.get(key).is_some(), "phase event missing {key}: {ev}");
            }
        }
    }

    let phases: Vec<&str> = events
        .iter()
        .filter(|e| e["event"] == "phase")
        .filter_map(|e| e["to"].as_str())
        .collect();
    assert_eq!(phases.first(), Some(&"awaiting_initial_weight"));
    assert!(phases.contains(&"draining"));
    assert_eq!(phases.last(), Some(&"completed"));

    let last = events.last().unwrap();
    assert_eq!(last["event"], "finished");
    assert_eq!(last["device_id"], "jsonl");
    assert_eq!(last["outcome"], "completed");
    assert_eq!(last["completion_reason"], "zero_mass");
    assert_eq!(last["sync_pending"], 0);
    assert!(last["elapsed_seconds"].is_u64());
}

#[test]
fn json_errors_go_to_stdout() {
    let dir = tempdir().unwrap();
    let (cfg, _) = setup(&dir);

    let out = Command::cargo_bin("drain_cli")
        .unwrap()
        .env("DRAIN_TEST_SIM_OFFLINE", "1")
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("health")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    let v: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["reason"], "DeviceUnreachable");
    assert!(v["message"].as_str().unwrap().contains("could not be reached"));
}
