//! CLI integration tests

use std::process::Command;

fn fleetctl(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_fleetctl"))
        .args(args)
        .env_remove("FLEETCTL_URL")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = fleetctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("fleet deployment daemon"), "Should show about text");
    assert!(stdout.contains("deploy"), "Should show deploy command");
    assert!(stdout.contains("fleet"), "Should show fleet command");
    assert!(stdout.contains("plan"), "Should show plan command");
}

#[test]
fn test_cli_version() {
    let output = fleetctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("fleetctl"));
}

#[test]
fn test_deploy_help_lists_flags() {
    let output = fleetctl(&["deploy", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for flag in ["--image", "--host-port", "--port-space", "--replicas"] {
        assert!(stdout.contains(flag), "Should show {}", flag);
    }
}

#[test]
fn test_deploy_requires_image() {
    let output = fleetctl(&["deploy", "svc", "--host-port", "8080", "--port-space", "9000"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--image"));
}

#[test]
fn test_deploy_rejects_out_of_range_port() {
    let output = fleetctl(&[
        "deploy",
        "svc",
        "--image",
        "demo",
        "--host-port",
        "70000",
        "--port-space",
        "9000",
    ]);

    assert!(!output.status.success());
}

#[test]
fn test_plan_three_replicas_offline() {
    let output = fleetctl(&["plan", "--replicas", "3"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "plan should not need a daemon");
    assert!(stdout.contains("replica-00"));
    assert!(stdout.contains("0.333333"));
    assert!(stdout.contains("0.500000"));
    assert!(stdout.contains("replica-02"));
}

#[test]
fn test_plan_json_output() {
    let output = fleetctl(&[
        "--format",
        "json",
        "plan",
        "10.0.0.1:9000",
        "10.0.0.2:9001",
        "--weights",
        "3,1",
    ]);
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows[0]["destination"], "10.0.0.1:9000");
    assert_eq!(rows[0]["probability"], "0.750000");
    assert_eq!(rows[1]["probability"], "-");
}

#[test]
fn test_plan_single_destination_fails() {
    let output = fleetctl(&["plan", "--replicas", "1"]);
    assert!(!output.status.success());
}

#[test]
fn test_plan_needs_destinations_or_replicas() {
    let output = fleetctl(&["plan"]);
    assert!(!output.status.success());
}

#[test]
fn test_invalid_command() {
    let output = fleetctl(&["nonexistent-command"]);
    assert!(!output.status.success(), "Invalid command should fail");
}
