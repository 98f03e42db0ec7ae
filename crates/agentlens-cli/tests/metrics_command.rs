use assert_cmd::Command;
use std::io::Write;

fn claude_session_line() -> &'static str {
    r#"{"type":"user","timestamp":"2026-01-01T00:00:00Z","message":{"role":"user","content":"hello"}}"#
}

#[test]
fn metrics_prints_json_for_a_single_event_session() {
    let dir = tempfile::tempdir().unwrap();
    let project_dir = dir.path().join("-home-user-project");
    std::fs::create_dir_all(&project_dir).unwrap();
    let session_path = project_dir.join("session-1.jsonl");
    let mut file = std::fs::File::create(&session_path).unwrap();
    writeln!(file, "{}", claude_session_line()).unwrap();

    Command::cargo_bin("agentlens")
        .unwrap()
        .args(["metrics", "--provider", "workspace-jsonl"])
        .arg(&session_path)
        .assert()
        .success()
        .stdout(predicates::str::contains("\"message_count\""));
}

#[test]
fn activity_reports_ended_for_an_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("empty.jsonl");
    std::fs::write(&session_path, "").unwrap();

    Command::cargo_bin("agentlens")
        .unwrap()
        .arg("activity")
        .arg(&session_path)
        .assert()
        .success()
        .stdout(predicates::str::contains("Ended"));
}
