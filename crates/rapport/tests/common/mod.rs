//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Path of the rapport binary built for this test run
pub fn get_rapport_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_rapport"))
}

/// Run the rapport binary in the specified directory with empty stdin
pub fn run_rapport_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(get_rapport_binary())
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute rapport binary")
}

/// Run the rapport binary and feed `input` on stdin
pub fn run_rapport_with_input(dir: &Path, args: &[&str], input: &str) -> Output {
    use std::io::Write;

    let mut child = Command::new(get_rapport_binary())
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn rapport binary");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(input.as_bytes())
        .expect("Failed to write stdin");

    child.wait_with_output().expect("Failed to wait for rapport")
}

/// Stdout of a successful run, panicking with stderr otherwise
pub fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "Command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Parse stdout of a successful `--json` run
pub fn json_of(output: &Output) -> serde_json::Value {
    serde_json::from_str(&stdout_of(output)).expect("stdout should be JSON")
}

/// Initialize a workspace and designate channel `main` of community `local`
pub fn init_and_designate(dir: &Path) {
    stdout_of(&run_rapport_in_dir(dir, &["init", "--quiet"]));
    stdout_of(&run_rapport_in_dir(dir, &["--admin", "set-channel"]));
}
