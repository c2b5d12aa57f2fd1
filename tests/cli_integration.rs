//! Smoke tests of the command-line binary.

use std::process::Command;

fn run(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_microgrid-twin"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("microgrid-twin process should run")
}

#[test]
fn quick_preset_prints_both_reports() {
    let output = run(&["--preset", "quick", "--log-level", "warn"]);
    assert!(
        output.status.success(),
        "quick run failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    assert!(stdout.contains("Episode   0:"), "stdout: {stdout}");
    assert!(stdout.contains("== baseline =="));
    assert!(stdout.contains("== ppo =="));
    assert!(stdout.contains("== ppo vs baseline =="));
    // Two reports plus the delta block.
    assert_eq!(stdout.matches("Safety violations:").count(), 3);
    assert_eq!(stdout.matches("Uptime:").count(), 3);
    assert_eq!(stdout.matches("CO2 saved").count(), 3);
    assert_eq!(stdout.matches("Cost savings:").count(), 3);
}

#[test]
fn scenario_file_with_forecast_and_telemetry() {
    let out = std::env::temp_dir().join(format!("microgrid-twin-{}.csv", std::process::id()));
    let out_str = out.to_string_lossy().to_string();
    let summary = std::env::temp_dir().join(format!("microgrid-summary-{}.csv", std::process::id()));
    let summary_str = summary.to_string_lossy().to_string();
    let output = run(&[
        "--scenario",
        "scenarios/quick.toml",
        "--seed",
        "3",
        "--telemetry-out",
        &out_str,
        "--summary-out",
        &summary_str,
        "--log-format",
        "json",
    ]);
    assert!(
        output.status.success(),
        "scenario run failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let csv = std::fs::read_to_string(&out).expect("telemetry file should exist");
    let _ = std::fs::remove_file(&out);
    let mut lines = csv.lines();
    assert!(lines.next().is_some_and(|h| h.starts_with("controller,step,")));
    let rows: Vec<&str> = lines.collect();
    assert!(rows.iter().any(|r| r.starts_with("baseline,")));
    assert!(rows.iter().any(|r| r.starts_with("ppo,")));

    let summary_csv = std::fs::read_to_string(&summary).expect("summary file should exist");
    let _ = std::fs::remove_file(&summary);
    let lines: Vec<&str> = summary_csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("uptime_pct") && lines[0].contains("co2_saved_t"));
    assert!(lines[1].starts_with("baseline,") && lines[2].starts_with("ppo,"));
}

#[test]
fn unknown_preset_is_rejected() {
    let output = run(&["--preset", "tornado"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown preset"), "stderr: {stderr}");
}

#[test]
fn invalid_scenario_reports_field_paths() {
    let path = std::env::temp_dir().join(format!("microgrid-bad-{}.toml", std::process::id()));
    std::fs::write(&path, "[battery]\ncapacity_kwh = -5.0\n").expect("write temp scenario");
    let output = run(&["--scenario", &path.to_string_lossy()]);
    let _ = std::fs::remove_file(&path);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("battery.capacity_kwh"), "stderr: {stderr}");
}
