//! Integration tests for the rapport CLI.
//!
//! These tests run the built binary against a temporary workspace and verify
//! the end-to-end behavior of every command.

use rstest::{fixture, rstest};
use tempfile::TempDir;

mod common;
use common::{init_and_designate, json_of, run_rapport_in_dir, run_rapport_with_input, stdout_of};

// ============================================================================
// Test Fixtures
// ============================================================================

/// Provides a fresh temporary directory for each test
#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Provides an initialized workspace whose `local` community tracks `main`
#[fixture]
fn designated_dir() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp directory");
    init_and_designate(temp.path());
    temp
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_cli_help() {
    let temp = TempDir::new().unwrap();
    let stdout = stdout_of(&run_rapport_in_dir(temp.path(), &["--help"]));

    assert!(stdout.contains("rapport"));
    assert!(stdout.contains("connect"));
    assert!(stdout.contains("clear-graph"));
}

#[test]
fn test_cli_version() {
    let temp = TempDir::new().unwrap();
    let stdout = stdout_of(&run_rapport_in_dir(temp.path(), &["--version"]));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

// ============================================================================
// Workspace Discovery
// ============================================================================

#[rstest]
fn test_commands_require_workspace(temp_dir: TempDir) {
    let output = run_rapport_in_dir(temp_dir.path(), &["link"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("rapport init"), "got: {stderr}");
}

// ============================================================================
// Scope Resolution
// ============================================================================

#[rstest]
fn test_connect_before_set_channel_fails(temp_dir: TempDir) {
    stdout_of(&run_rapport_in_dir(temp_dir.path(), &["init", "--quiet"]));

    let output = run_rapport_in_dir(temp_dir.path(), &["connect", "1", "2"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No designated channel"));
}

#[rstest]
fn test_set_channel_requires_admin(temp_dir: TempDir) {
    stdout_of(&run_rapport_in_dir(temp_dir.path(), &["init", "--quiet"]));

    let output = run_rapport_in_dir(temp_dir.path(), &["set-channel"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Administrator"));
}

#[rstest]
fn test_connect_in_wrong_channel_fails(designated_dir: TempDir) {
    let output = run_rapport_in_dir(designated_dir.path(), &["--channel", "other", "connect", "1", "2"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("designated"));
}

// ============================================================================
// Connect / Delete
// ============================================================================

#[rstest]
fn test_connect_adds_all_pairs(designated_dir: TempDir) {
    let value = json_of(&run_rapport_in_dir(
        designated_dir.path(),
        &["--json", "connect", "1", "2", "3"],
    ));

    assert_eq!(value["status"], "added");
    assert_eq!(value["added"].as_array().unwrap().len(), 3);
    assert_eq!(value["link"]["status"], "published");
    assert!(
        value["link"]["url"]
            .as_str()
            .unwrap()
            .starts_with("http://localhost:8000/graph_local_")
    );

    let graphs = std::fs::read_to_string(designated_dir.path().join(".rapport/graphs.jsonl")).unwrap();
    assert!(graphs.contains(r#"["1","2"]"#));
    assert!(graphs.contains(r#"["2","3"]"#));
}

#[rstest]
fn test_connect_twice_reports_already_connected(designated_dir: TempDir) {
    stdout_of(&run_rapport_in_dir(designated_dir.path(), &["connect", "1", "2"]));

    let value = json_of(&run_rapport_in_dir(designated_dir.path(), &["--json", "connect", "2", "1"]));

    assert_eq!(value["status"], "already_connected");
    assert_eq!(value["already_connected"][0], serde_json::json!(["1", "2"]));
}

#[rstest]
fn test_connect_single_distinct_user_is_rejected(designated_dir: TempDir) {
    let output = run_rapport_in_dir(designated_dir.path(), &["connect", "1", "1"]);
    assert!(!output.status.success());
}

#[rstest]
fn test_delete_removes_edge_and_keeps_nodes(designated_dir: TempDir) {
    stdout_of(&run_rapport_in_dir(designated_dir.path(), &["connect", "1", "2", "3"]));

    let value = json_of(&run_rapport_in_dir(designated_dir.path(), &["--json", "delete", "3", "1"]));
    assert_eq!(value["status"], "removed");
    assert_eq!(value["edge"], serde_json::json!(["1", "3"]));

    let value = json_of(&run_rapport_in_dir(designated_dir.path(), &["--json", "delete", "1", "3"]));
    assert_eq!(value["status"], "not_found");

    let info = json_of(&run_rapport_in_dir(designated_dir.path(), &["--json", "info"]));
    assert_eq!(info["scopes"][0]["nodes"], 3);
    assert_eq!(info["scopes"][0]["edges"], 2);
}

// ============================================================================
// Rendering and Links
// ============================================================================

#[rstest]
fn test_graph_writes_dot_file(designated_dir: TempDir) {
    stdout_of(&run_rapport_in_dir(designated_dir.path(), &["connect", "alice", "bob"]));

    let value = json_of(&run_rapport_in_dir(
        designated_dir.path(),
        &["--json", "graph", "--out", "out.dot"],
    ));
    assert_eq!(value["status"], "written");

    let dot = std::fs::read_to_string(designated_dir.path().join("out.dot")).unwrap();
    assert!(dot.starts_with("graph {"));
    assert!(dot.contains("alice"));
    assert!(dot.contains("Graph for local"));
}

#[rstest]
fn test_graph_and_link_without_data(designated_dir: TempDir) {
    let value = json_of(&run_rapport_in_dir(designated_dir.path(), &["--json", "graph"]));
    assert_eq!(value["status"], "no_data");

    let value = json_of(&run_rapport_in_dir(designated_dir.path(), &["--json", "link"]));
    assert_eq!(value["status"], "no_data");
}

#[rstest]
fn test_link_publishes_into_public_directory(designated_dir: TempDir) {
    stdout_of(&run_rapport_in_dir(designated_dir.path(), &["connect", "1", "2"]));

    let value = json_of(&run_rapport_in_dir(designated_dir.path(), &["--json", "link"]));
    let url = value["url"].as_str().unwrap();
    let name = url.rsplit('/').next().unwrap();

    let html = std::fs::read_to_string(designated_dir.path().join("public").join(name)).unwrap();
    assert!(html.contains("vis-network"));
    assert!(html.contains("\"label\":\"1\""));
}

#[rstest]
fn test_link_leaves_out_users_missing_from_roster(designated_dir: TempDir) {
    std::fs::write(
        designated_dir.path().join(".rapport/members.yaml"),
        "communities:\n  local:\n    name: Home\n    members:\n      '1': Ada\n      '2': Grace\n",
    )
    .unwrap();
    stdout_of(&run_rapport_in_dir(designated_dir.path(), &["connect", "1", "2", "3"]));

    let value = json_of(&run_rapport_in_dir(designated_dir.path(), &["--json", "link"]));
    let name = value["url"].as_str().unwrap().rsplit('/').next().unwrap().to_string();
    let html = std::fs::read_to_string(designated_dir.path().join("public").join(name)).unwrap();

    assert!(html.contains("Ada"));
    assert!(html.contains("Grace"));
    assert!(!html.contains("\"label\":\"3\""));
}

// ============================================================================
// Clear
// ============================================================================

#[rstest]
fn test_clear_graph_with_yes_flag(designated_dir: TempDir) {
    stdout_of(&run_rapport_in_dir(designated_dir.path(), &["connect", "1", "2"]));

    let value = json_of(&run_rapport_in_dir(
        designated_dir.path(),
        &["--json", "--admin", "clear-graph", "--yes"],
    ));
    assert_eq!(value["status"], "cleared");

    let value = json_of(&run_rapport_in_dir(
        designated_dir.path(),
        &["--json", "--admin", "clear-graph", "--yes"],
    ));
    assert_eq!(value["status"], "nothing_to_clear");
}

#[rstest]
fn test_clear_graph_reads_confirmation_from_stdin(designated_dir: TempDir) {
    stdout_of(&run_rapport_in_dir(designated_dir.path(), &["connect", "1", "2"]));

    let output = run_rapport_with_input(designated_dir.path(), &["--admin", "clear-graph"], "YES\n");
    let stdout = stdout_of(&output);

    assert!(stdout.contains("Type 'yes' to confirm"));
    assert!(stdout.contains("Graph data cleared."));
}

#[rstest]
fn test_clear_graph_declined_keeps_data(designated_dir: TempDir) {
    stdout_of(&run_rapport_in_dir(designated_dir.path(), &["connect", "1", "2"]));
    let graphs_path = designated_dir.path().join(".rapport/graphs.jsonl");
    let before = std::fs::read(&graphs_path).unwrap();

    let output = run_rapport_with_input(designated_dir.path(), &["--admin", "clear-graph"], "no\n");

    assert!(!output.status.success());
    assert_eq!(std::fs::read(&graphs_path).unwrap(), before);
}

#[rstest]
fn test_clear_graph_with_closed_stdin_keeps_data(designated_dir: TempDir) {
    stdout_of(&run_rapport_in_dir(designated_dir.path(), &["connect", "1", "2"]));
    let graphs_path = designated_dir.path().join(".rapport/graphs.jsonl");
    let before = std::fs::read(&graphs_path).unwrap();

    let output = run_rapport_in_dir(designated_dir.path(), &["--admin", "clear-graph"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("timed out"));
    assert_eq!(std::fs::read(&graphs_path).unwrap(), before);
}

#[rstest]
fn test_clear_graph_requires_admin(designated_dir: TempDir) {
    let output = run_rapport_in_dir(designated_dir.path(), &["clear-graph", "--yes"]);
    assert!(!output.status.success());
}

// ============================================================================
// Chat Messages
// ============================================================================

#[rstest]
fn test_say_connect_uses_mentions(designated_dir: TempDir) {
    let stdout = stdout_of(&run_rapport_in_dir(
        designated_dir.path(),
        &["say", "-connect", "<@1>", "and", "<@!2>"],
    ));

    assert!(stdout.contains("New connections added between the mentioned users."));
    assert!(stdout.contains("Here is your interactive graph: http://localhost:8000/"));
}

#[rstest]
fn test_say_cleargraph_without_admin(designated_dir: TempDir) {
    let stdout = stdout_of(&run_rapport_in_dir(designated_dir.path(), &["say", "-cleargraph"]));
    assert!(stdout.contains("You do not have permission to use this command."));
}

#[rstest]
fn test_say_plain_text_is_ignored(designated_dir: TempDir) {
    let value = json_of(&run_rapport_in_dir(designated_dir.path(), &["--json", "say", "hello", "there"]));
    assert_eq!(value["status"], "ignored");
}

#[rstest]
fn test_say_setchannel_moves_tracking(designated_dir: TempDir) {
    let stdout = stdout_of(&run_rapport_in_dir(
        designated_dir.path(),
        &["--admin", "--channel", "c2", "say", "-setchannel"],
    ));
    assert!(stdout.contains("This channel (<#c2>) has been set as the designated channel"));

    let stdout = stdout_of(&run_rapport_in_dir(designated_dir.path(), &["say", "-link"]));
    assert!(stdout.contains("This command can only be used in the designated tracking channel."));
}
