//! E2E CLI workflow tests.
//!
//! Each test runs `cmap` as a subprocess in an isolated temp directory laid
//! out the way a served plan is: `cases/<version>/` fragments and
//! `results/<version>/<user>.json` status files.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

fn cmap(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cmap"));
    cmd.current_dir(dir);
    cmd.env("CASEMAP_LOG", "error");
    cmd.env_remove("CASEMAP_SOURCE");
    cmd.env_remove("FORMAT");
    cmd
}

/// A project with two fragments for v1, one result file for alice and a
/// config with no save delay.
fn project() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    let cases = dir.path().join("cases/v1");
    fs::create_dir_all(&cases).expect("cases dir");
    fs::write(
        cases.join("01-login.md"),
        "## Login\n\n- [LOGIN-001] Valid password\n- [LOGIN-002] Wrong password\n  - Error banner is shown\n",
    )
    .expect("fragment");
    fs::write(cases.join("02-pay.md"), "## Payment\n\n- [PAY-001] Card\n").expect("fragment");
    fs::write(cases.join("notes.txt"), "not a fragment").expect("notes");

    let results = dir.path().join("results/v1");
    fs::create_dir_all(&results).expect("results dir");
    fs::write(
        results.join("alice.json"),
        r#"{"LOGIN-001": "✅", "PAY-001": "🟡"}"#,
    )
    .expect("results");

    fs::write(dir.path().join("casemap.toml"), "[save]\nack_delay_ms = 0\n").expect("config");
    dir
}

fn merge(dir: &Path) {
    cmap(dir).args(["merge", "v1"]).assert().success();
}

fn json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("cmap should not crash");
    assert!(
        output.status.success(),
        "cmap failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON")
}

fn status_of(show: &Value, case: &str) -> Option<String> {
    show["rows"]
        .as_array()?
        .iter()
        .find(|row| row["case_id"] == case)
        .and_then(|row| row["status"].as_str())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

#[test]
fn merge_writes_index_from_markdown_fragments() {
    let dir = project();
    fs::write(dir.path().join("cases/v1/03-upper.MD"), "- [Z-9] upper\n").expect("fragment");
    let out = json(cmap(dir.path()).args(["merge", "v1", "--json"]));
    assert_eq!(out["fragments"], serde_json::json!(["01-login.md", "02-pay.md"]));

    let merged = fs::read_to_string(dir.path().join("cases/v1/_index.md")).expect("index");
    assert!(merged.starts_with("# v1 Test Cases\n\n## Login"));
    assert!(merged.find("LOGIN-001") < merged.find("PAY-001"));
    assert!(!merged.contains("not a fragment"));
    assert!(!merged.contains("Z-9"));
}

#[test]
fn merge_missing_version_fails_with_code() {
    let dir = project();
    cmap(dir.path())
        .args(["merge", "v9", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E4001"));
    assert!(!dir.path().join("cases/v9").exists());
}

#[test]
fn merge_rejects_path_like_versions() {
    let dir = project();
    cmap(dir.path())
        .args(["merge", "../v1", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1002"));
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

#[test]
fn show_decorates_every_case_with_the_testers_results() {
    let dir = project();
    merge(dir.path());
    let show = json(cmap(dir.path()).args(["show", "v1", "--user", "alice", "--json"]));

    assert_eq!(show["user"], "alice");
    assert_eq!(status_of(&show, "LOGIN-001").as_deref(), Some("pass"));
    assert_eq!(status_of(&show, "LOGIN-002").as_deref(), Some("untested"));
    assert_eq!(status_of(&show, "PAY-001").as_deref(), Some("blocked"));

    let login = show["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .find(|row| row["case_id"] == "LOGIN-001")
        .expect("login row");
    assert!(login["text"].as_str().expect("text").starts_with("✅ [LOGIN-001]"));
}

#[test]
fn show_for_default_user_is_all_untested() {
    let dir = project();
    merge(dir.path());
    let show = json(cmap(dir.path()).args(["show", "v1", "--json"]));
    assert_eq!(status_of(&show, "LOGIN-001").as_deref(), Some("untested"));
    assert_eq!(show["totals"][0], serde_json::json!(["untested", 3]));
}

#[test]
fn show_text_output_indents_nested_rows() {
    let dir = project();
    merge(dir.path());
    cmap(dir.path())
        .args(["show", "v1", "--user", "alice", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("    Error banner is shown"));
}

#[test]
fn show_unmerged_version_fails() {
    let dir = project();
    cmap(dir.path())
        .args(["show", "v1", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E3001"));
}

#[test]
fn show_honours_source_flag() {
    let dir = project();
    merge(dir.path());
    let elsewhere = TempDir::new().expect("tempdir");
    let show = json(cmap(elsewhere.path()).args([
        "show",
        "v1",
        "--user",
        "alice",
        "--source",
        dir.path().to_str().expect("utf8 path"),
        "--json",
    ]));
    assert_eq!(status_of(&show, "PAY-001").as_deref(), Some("blocked"));
}

// ---------------------------------------------------------------------------
// cycle and save
// ---------------------------------------------------------------------------

#[test]
fn cycle_advances_each_click() {
    let dir = project();
    merge(dir.path());
    let out = json(cmap(dir.path()).args([
        "cycle", "v1", "--user", "alice", "LOGIN-001", "LOGIN-002", "LOGIN-002", "--json",
    ]));
    let statuses: Vec<&str> = out["changes"]
        .as_array()
        .expect("changes")
        .iter()
        .map(|c| c["status"].as_str().expect("status"))
        .collect();
    assert_eq!(statuses, vec!["fail", "pass", "fail"]);
    assert!(out.get("save").is_none());
}

#[test]
fn cycle_reports_unknown_cases() {
    let dir = project();
    merge(dir.path());
    let out = json(cmap(dir.path()).args(["cycle", "v1", "--user", "alice", "NOPE-1", "--json"]));
    assert_eq!(out["missing"], serde_json::json!(["NOPE-1"]));
    assert_eq!(out["changes"], serde_json::json!([]));
}

#[test]
fn cycle_as_default_user_is_rejected() {
    let dir = project();
    merge(dir.path());
    cmap(dir.path())
        .args(["cycle", "v1", "--user", "default", "LOGIN-001", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"));
}

#[test]
fn save_posts_envelope_to_host_file() {
    let dir = project();
    merge(dir.path());
    let host = dir.path().join("saves.jsonl");
    let out = json(cmap(dir.path()).args([
        "cycle",
        "v1",
        "--user",
        "alice",
        "LOGIN-002",
        "--save",
        "--host-out",
        host.to_str().expect("utf8 path"),
        "--json",
    ]));
    assert_eq!(out["save"], "sent");

    let line = fs::read_to_string(&host).expect("host file");
    let envelope: Value = serde_json::from_str(line.trim()).expect("envelope");
    assert_eq!(envelope["action"], "saveData");
    assert_eq!(envelope["payload"]["version"], "v1");
    assert_eq!(envelope["payload"]["user"], "alice");
    assert_eq!(envelope["payload"]["message"], "[Test] alice updated results for v1");
    assert_eq!(envelope["payload"]["content"]["LOGIN-001"], "✅");
    assert_eq!(envelope["payload"]["content"]["LOGIN-002"], "✅");
    assert_eq!(envelope["payload"]["content"]["PAY-001"], "🟡");
}

#[test]
fn stdout_host_with_json_output_is_refused() {
    let dir = project();
    merge(dir.path());
    let output = cmap(dir.path())
        .args([
            "cycle", "v1", "--user", "alice", "LOGIN-001", "--save", "--host-out", "-", "--json",
        ])
        .output()
        .expect("cmap should not crash");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty(), "nothing may reach stdout");
    let err: Value = serde_json::from_slice(&output.stderr).expect("JSON error");
    assert!(err["error"]["message"].as_str().expect("message").contains("--host-out"));
}

#[test]
fn stdout_host_with_text_output_prints_envelope_then_changes() {
    let dir = project();
    merge(dir.path());
    cmap(dir.path())
        .args([
            "cycle", "v1", "--user", "alice", "LOGIN-001", "--save", "--host-out", "-", "--format",
            "text",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"action\":\"saveData\""))
        .stdout(predicate::str::contains("LOGIN-001\tfail"));
}

#[test]
fn save_without_host_is_surfaced_not_dropped() {
    let dir = project();
    merge(dir.path());
    cmap(dir.path())
        .args(["cycle", "v1", "--user", "alice", "PAY-001", "--save", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not_persisted"))
        .stderr(predicate::str::contains("payload"));
}

#[test]
fn unparsable_config_reports_its_code() {
    let dir = project();
    merge(dir.path());
    fs::write(dir.path().join("casemap.toml"), "[save\n").expect("config");
    cmap(dir.path())
        .args(["show", "v1", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"));
}

// ---------------------------------------------------------------------------
// demo and completions
// ---------------------------------------------------------------------------

#[test]
fn demo_plan_needs_no_files() {
    let dir = TempDir::new().expect("tempdir");
    let show = json(cmap(dir.path()).args(["--demo", "show", "v1", "--user", "alice", "--json"]));
    assert_eq!(status_of(&show, "LOGIN-002").as_deref(), Some("fail"));
}

#[test]
fn completions_mention_binary_name() {
    let dir = TempDir::new().expect("tempdir");
    cmap(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cmap"));
}
