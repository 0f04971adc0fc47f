//! Basic CLI E2E tests.
//!
//! Tests invoke the `eyerest` binary against a throwaway data directory and
//! verify outputs.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (code, stdout, stderr).
fn run_cli(data_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_eyerest"))
        .args(args)
        .env("EYEREST_DATA_DIR", data_dir)
        .env_remove("EYEREST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_timer_status_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["timer", "status"]);
    assert_eq!(code, 0, "Timer status failed");

    let snap = json(&stdout);
    assert_eq!(snap["remaining"], "20:00");
    assert_eq!(snap["phase"], "work");
    assert_eq!(snap["is_running"], false);
    assert_eq!(snap["mode"], "manual");
    assert_eq!(snap["counters"]["work_completed"], 0);
}

#[test]
fn test_settings_set_clamps_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(dir.path(), &["settings", "set", "relax", "abc"]);
    assert_eq!(code, 0, "Settings set failed");

    let (code, stdout, _) = run_cli(dir.path(), &["settings", "get", "relax"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "1");

    run_cli(dir.path(), &["settings", "set", "work", "25"]);
    let (_, stdout, _) = run_cli(dir.path(), &["timer", "status"]);
    assert_eq!(json(&stdout)["remaining"], "25:00");
}

#[test]
fn test_settings_unknown_name_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["settings", "set", "volume", "3"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_settings_list() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["settings", "list"]);
    assert_eq!(code, 0, "Settings list failed");
    let settings = json(&stdout);
    assert_eq!(settings["work_minutes"], 20);
    assert_eq!(settings["alert_kind"], "sound");
}

#[test]
fn test_timer_mode_toggle_persists() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stdout, _) = run_cli(dir.path(), &["timer", "mode"]);
    assert_eq!(stdout.trim(), "manual");
    let (code, stdout, _) = run_cli(dir.path(), &["timer", "mode", "--toggle"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "automate");
    let (_, stdout, _) = run_cli(dir.path(), &["timer", "mode"]);
    assert_eq!(stdout.trim(), "automate");
}

#[test]
fn test_timer_reset() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["timer", "reset"]);
    assert_eq!(code, 0, "Timer reset failed");
    assert_eq!(json(&stdout)["type"], "TimerReset");
}

#[test]
fn test_config_get_set_list() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "get", "timer.tick_ms"]);
    assert_eq!(code, 0, "Config get failed");
    assert_eq!(stdout.trim(), "1000");

    let (code, stdout, _) = run_cli(dir.path(), &["config", "set", "timer.seconds_mode", "true"]);
    assert_eq!(code, 0, "Config set failed");
    assert_eq!(stdout.trim(), "timer.seconds_mode = true");

    let (code, stdout, _) = run_cli(dir.path(), &["config", "list"]);
    assert_eq!(code, 0, "Config list failed");
    assert_eq!(json(&stdout)["timer"]["seconds_mode"], true);

    // Seconds mode reads the work setting as seconds.
    let (_, stdout, _) = run_cli(dir.path(), &["timer", "status"]);
    assert_eq!(json(&stdout)["remaining"], "00:20");
}

#[test]
fn test_config_unknown_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(dir.path(), &["config", "set", "timer.turbo", "1"]);
    assert_ne!(code, 0);

    let (code, _, stderr) = run_cli(dir.path(), &["config", "get", "timer.turbo"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("timer.turbo"));
}

#[test]
fn test_stats_empty_history() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["stats", "all"]);
    assert_eq!(code, 0, "Stats all failed");
    assert_eq!(json(&stdout)["total_sessions"], 0);

    let (code, stdout, _) = run_cli(dir.path(), &["stats", "recent"]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout), serde_json::json!([]));
}

#[test]
fn test_completions() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("eyerest"));
}
