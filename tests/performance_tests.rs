use assert_cmd::cargo_bin;
use std::process::Command;

mod common;

#[test]
fn test_generated_log_is_well_formed() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("generated.csv");
    common::generate_csv(&output_path, 5).expect("Failed to generate CSV");

    let content = std::fs::read_to_string(&output_path).expect("Failed to read file");
    // Header + listing + 5 requests
    assert_eq!(content.lines().count(), 7);
}

#[test]
fn test_random_command_log_replay() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("random.csv");
    common::generate_random_csv(&output_path, 5_000).expect("Failed to generate CSV");

    let output = Command::new(cargo_bin!("bookswap"))
        .arg(&output_path)
        .env("RUST_LOG", "error")
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success(), "Binary failed to replay the log");

    let stdout = String::from_utf8_lossy(&output.stdout);
    // Header + one row per listed book
    assert_eq!(stdout.lines().count(), 21);
}

#[test]
fn test_many_requests_on_one_book() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("crowded.csv");
    common::generate_csv(&output_path, 500).expect("Failed to generate CSV");

    let status = Command::new(cargo_bin!("bookswap"))
        .arg(&output_path)
        .env("RUST_LOG", "error")
        .status()
        .expect("Failed to execute command");
    assert!(status.success());
}
