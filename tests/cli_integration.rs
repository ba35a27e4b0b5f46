//! Integration tests for the `cg` binary
//!
//! Each test runs the binary in an isolated home directory so no user
//! configuration or credentials leak in.

mod common;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use serde_json::{Value, json};
use tempfile::TempDir;

fn cg_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_cg"))
}

/// Command with HOME, XDG dirs and the working directory pointed at `home`
fn cg(home: &Path) -> Command {
    let mut cmd = Command::new(cg_binary());
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_DATA_HOME", home.join(".local/share"))
        .env("CG_DIR", home.join("cg"))
        .env_remove("CG_CONFIG")
        .env_remove("CG_API_KEY")
        .env_remove("CG_AGENT_ID")
        .env_remove("CG_CREW_ID")
        .env_remove("CG_API_URL")
        .env_remove("RUST_LOG");
    cmd
}

fn run_cg(home: &Path, args: &[&str]) -> Output {
    cg(home).args(args).output().expect("Failed to execute cg")
}

fn run_cg_with_stdin(mut cmd: Command, stdin: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn cg");
    child.stdin.take().unwrap().write_all(stdin.as_bytes()).unwrap();
    child.wait_with_output().unwrap()
}

fn write_config(home: &Path, yaml: &str) -> PathBuf {
    let path = home.join("contextgraph-test.yaml");
    fs::write(&path, yaml).unwrap();
    path
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

const POLICIES: &str = r#"[
    {"name": "review-prod", "condition": {"field": "context.env", "equals": "prod"}, "effect": "require_approval"},
    {"name": "no-deletes", "condition": {"and": [
        {"field": "type", "equals": "tool_execution"},
        {"field": "action", "in": ["delete_file", "drop_table"]}
    ]}, "effect": "deny"}
]"#;

#[test]
fn test_policy_check_deny() {
    let home = TempDir::new().unwrap();
    let policy_file = home.path().join("policies.json");
    fs::write(&policy_file, POLICIES).unwrap();

    let decision = json!({"type": "tool_execution", "action": "delete_file", "context": {"env": "prod"}}).to_string();
    let output = run_cg(
        home.path(),
        &["policy", "check", policy_file.to_str().unwrap(), "--decision", &decision, "-o", "json"],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_json(&output),
        json!({"effect": "deny", "matched": ["review-prod", "no-deletes"]})
    );
}

#[test]
fn test_policy_check_reads_decision_from_stdin() {
    let home = TempDir::new().unwrap();
    let policy_file = home.path().join("policies.json");
    fs::write(&policy_file, POLICIES).unwrap();

    let mut cmd = cg(home.path());
    cmd.args(["policy", "check", policy_file.to_str().unwrap(), "-o", "json"]);
    let output = run_cg_with_stdin(cmd, r#"{"type": "model_call", "action": "invoke_model"}"#);

    assert!(output.status.success());
    assert_eq!(stdout_json(&output), json!({"effect": "allow", "matched": []}));
}

#[test]
fn test_policy_check_rejects_bad_document() {
    let home = TempDir::new().unwrap();
    let policy_file = home.path().join("policies.json");
    fs::write(&policy_file, r#"{"effect": "sometimes"}"#).unwrap();

    let output = run_cg(
        home.path(),
        &["policy", "check", policy_file.to_str().unwrap(), "--decision", "{}"],
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to parse policy file"));
}

#[test]
fn test_config_show_json_masks_key() {
    let home = TempDir::new().unwrap();
    let config = write_config(
        home.path(),
        r#"
api_key: cg_live_abcdef
agent_id: yaml-agent
timeout_secs: 45
metadata:
  team: payments
enforcement:
  enabled: true
"#,
    );

    let output = run_cg(
        home.path(),
        &["--config", config.to_str().unwrap(), "config", "show", "-o", "json"],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let shown = stdout_json(&output);
    assert_eq!(shown["api_key"], "cg_l****");
    assert_eq!(shown["agent_id"], "yaml-agent");
    assert_eq!(shown["timeout_secs"], 45);
    assert_eq!(shown["metadata"]["team"], "payments");
    assert_eq!(shown["enforcement"]["enabled"], true);
    assert_eq!(shown["enforcement"]["poll_interval_ms"], 1000);
    assert_eq!(shown["langchain"]["log_llm_calls"], false);
}

#[test]
fn test_missing_config_file_fails() {
    let home = TempDir::new().unwrap();
    let output = run_cg(home.path(), &["--config", "does-not-exist.yaml", "config", "show"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load configuration"));
}

#[test]
fn test_guard_requires_agent_id() {
    let home = TempDir::new().unwrap();
    let output = run_cg(home.path(), &["guard", "--payload", r#"{"tool_name": "Bash"}"#]);

    assert_eq!(output.status.code(), Some(1));
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("ContextGraph agent ID required"),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_guard_requires_api_key() {
    let home = TempDir::new().unwrap();
    let output = cg(home.path())
        .env("CG_AGENT_ID", "agent-1")
        .args(["guard", "--payload", r#"{"tool_name": "Bash"}"#])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ContextGraph API key required"));
}

#[test]
fn test_guard_fails_open_when_unreachable() {
    let home = TempDir::new().unwrap();
    let config = write_config(
        home.path(),
        "api_key: k\nagent_id: agent-1\nenforcement:\n  enabled: true\n",
    );

    let output = cg(home.path())
        .env("CG_API_URL", common::closed_url())
        .args(["--config", config.to_str().unwrap(), "guard", "--payload", r#"{"tool_name": "Bash"}"#])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stderr).contains("allowing"));
}

#[test]
fn test_guard_fails_closed_when_unreachable() {
    let home = TempDir::new().unwrap();
    let config = write_config(
        home.path(),
        "api_key: k\nagent_id: agent-1\nenforcement:\n  enabled: true\n  fail_closed: true\n",
    );

    let output = cg(home.path())
        .env("CG_API_URL", common::closed_url())
        .args(["--config", config.to_str().unwrap(), "guard", "--payload", r#"{"tool_name": "Bash"}"#])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("blocked by ContextGraph"));
}

#[test]
fn test_guard_blocks_denied_decision() {
    let home = TempDir::new().unwrap();
    let (url, server) = common::serve(vec![(201, r#"{"id": "dec-1", "status": "denied"}"#.to_string())]);
    let config = write_config(
        home.path(),
        &format!("api_key: k\nagent_id: agent-1\napi_url: {}\nenforcement:\n  enabled: true\n", url),
    );

    let mut cmd = cg(home.path());
    cmd.args(["--config", config.to_str().unwrap(), "guard"]);
    let output = run_cg_with_stdin(
        cmd,
        r#"{"tool_name": "Bash", "tool_input": {"command": "rm -rf /"}, "session_id": "s-1"}"#,
    );

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Bash"));
    assert!(stderr.contains("dec-1"));

    let captured = server.join().unwrap();
    let body: Value = serde_json::from_str(&captured[0].body).unwrap();
    assert_eq!(body["type"], "tool_execution");
    assert_eq!(body["action"], "Bash");
    assert_eq!(body["context"]["tool_input"]["command"], "rm -rf /");
    assert_eq!(body["context"]["session_id"], "s-1");
    assert_eq!(body["context"]["source"], "cli");
}

#[test]
fn test_guard_audit_only_allows() {
    let home = TempDir::new().unwrap();
    let (url, server) = common::serve(vec![(201, r#"{"id": "dec-2", "status": "denied"}"#.to_string())]);
    let config = write_config(home.path(), &format!("api_key: k\nagent_id: agent-1\napi_url: {}\n", url));

    let output = run_cg(
        home.path(),
        &["--config", config.to_str().unwrap(), "guard", "--payload", r#"{"tool_name": "Read"}"#],
    );

    assert_eq!(output.status.code(), Some(0));
    server.join().unwrap();
}

#[test]
fn test_decision_log_rejects_unknown_type() {
    let home = TempDir::new().unwrap();
    let output = run_cg(home.path(), &["decision", "log", "--type", "bogus", "--action", "x"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown decision type: bogus"));
}

#[test]
fn test_completions() {
    let home = TempDir::new().unwrap();
    let output = run_cg(home.path(), &["completions", "bash"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("cg"));
}

#[test]
fn test_doctor_fails_without_api_key() {
    let home = TempDir::new().unwrap();
    let output = run_cg(home.path(), &["doctor"]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ContextGraph API key required"));
    assert!(stdout.contains("1 issue(s) found"));
}

#[test]
fn test_doctor_passes_when_service_answers() {
    let home = TempDir::new().unwrap();
    let (url, server) = common::serve(vec![(200, r#"{"data": []}"#.to_string())]);
    let config = write_config(home.path(), &format!("api_key: k\nagent_id: agent-1\napi_url: {}\n", url));

    let output = run_cg(home.path(), &["--config", config.to_str().unwrap(), "doctor"]);

    assert_eq!(output.status.code(), Some(0), "stdout: {}", String::from_utf8_lossy(&output.stdout));
    assert!(String::from_utf8_lossy(&output.stdout).contains("All checks passed"));

    let captured = server.join().unwrap();
    assert_eq!(captured[0].request_line, "GET /v1/decisions?limit=1 HTTP/1.1");
}
