//! Common utilities for CLI E2E tests.

use std::path::Path;
use std::process::Command;

/// Invoke a CLI command against an isolated data directory and return
/// (stdout, stderr, exit code).
pub fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "fastrack-cli", "--"])
        .args(args)
        .env("FASTRACK_DATA_DIR", data_dir)
        .env_remove("FASTRACK_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Invoke a CLI command and expect success.
pub fn run_cli_success(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    if code != 0 && !stderr.is_empty() {
        eprintln!("CLI error output: {}", stderr);
    }
    assert_eq!(code, 0, "CLI command failed with code {}: {:?}", code, args);
    stdout
}

/// Invoke a CLI command and expect failure.
pub fn run_cli_failure(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert!(code != 0, "CLI command unexpectedly succeeded: {:?}", args);
    (stdout, stderr, code)
}

/// Parse the first pretty-printed JSON document in CLI output.
pub fn parse_first_json(output: &str) -> serde_json::Value {
    let mut stream = serde_json::Deserializer::from_str(output).into_iter::<serde_json::Value>();
    stream
        .next()
        .expect("no JSON in CLI output")
        .expect("Failed to parse JSON output")
}
