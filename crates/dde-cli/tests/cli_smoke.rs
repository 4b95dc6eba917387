use std::process::Command;

use dde_agg::{load_profile, AggregateReport, AggregationProfile};

fn dde() -> Command {
    Command::new(env!("CARGO_BIN_EXE_dde"))
}

#[test]
fn profile_command_writes_default_profile() {
    let dir = tempfile::tempdir().expect("temp dir");
    let out = dir.path().join("profiles").join("default.yaml");
    let status = dde()
        .args(["profile", "--out"])
        .arg(&out)
        .status()
        .expect("run dde profile");
    assert!(status.success());
    let profile = load_profile(&out).expect("profile loads");
    assert_eq!(profile, AggregationProfile::default());
}

#[test]
fn aggregate_of_empty_data_dir_writes_report() {
    let data = tempfile::tempdir().expect("data dir");
    let dump = tempfile::tempdir().expect("dump dir");
    let output = dde()
        .args(["aggregate", "--data-dir"])
        .arg(data.path())
        .arg("--dump")
        .arg(dump.path())
        .output()
        .expect("run dde aggregate");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Skipped (0):"), "{stdout}");
    let report = AggregateReport::load(dump.path()).expect("report");
    assert_eq!(report.total_runs(), 0);
}

#[test]
fn aggregate_fails_fast_on_missing_data_dir() {
    let dump = tempfile::tempdir().expect("dump dir");
    let status = dde()
        .args(["aggregate", "--data-dir"])
        .arg(dump.path().join("absent"))
        .arg("--dump")
        .arg(dump.path())
        .status()
        .expect("run dde aggregate");
    assert!(!status.success());
}

#[test]
fn aggregate_rejects_zero_resolution() {
    let data = tempfile::tempdir().expect("data dir");
    let status = dde()
        .args(["aggregate", "--resolution", "0", "--data-dir"])
        .arg(data.path())
        .arg("--dump")
        .arg(data.path())
        .status()
        .expect("run dde aggregate");
    assert!(!status.success());
}
