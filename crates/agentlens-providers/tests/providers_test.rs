use agentlens_providers::{SessionProvider, WorkspaceJsonlProvider};
use std::path::Path;

#[test]
fn workspace_jsonl_round_trip_discovers_and_reads_a_session() {
    let root = tempfile::tempdir().unwrap();
    let provider = WorkspaceJsonlProvider::new(root.path());
    let workspace = Path::new("/home/user/demo-project");

    let session_dir = provider.get_session_directory(workspace);
    std::fs::create_dir_all(&session_dir).unwrap();
    let session_path = session_dir.join("abc123.jsonl");
    std::fs::write(
        &session_path,
        concat!(
            "{\"type\":\"user\",\"message\":{\"content\":\"please add retries\"}}\n",
            "{\"type\":\"assistant\",\"message\":{\"model\":\"m1\",\"content\":[",
            "{\"type\":\"tool_use\",\"id\":\"t1\",\"name\":\"Bash\",\"input\":{\"command\":\"cargo test\"}},",
            "{\"type\":\"text\",\"text\":\"ran the tests\"}],",
            "\"usage\":{\"input_tokens\":12,\"output_tokens\":4}}}\n",
        ),
    )
    .unwrap();

    assert_eq!(provider.find_all_sessions(workspace), vec![session_path.clone()]);
    assert_eq!(
        provider.extract_session_label(&session_path).as_deref(),
        Some("please add retries")
    );

    let mut reader = provider.create_reader(&session_path).unwrap();
    let events = reader.read_all().unwrap();
    assert_eq!(events.len(), 3);

    let hits = provider.search_in_session(&session_path, "retries", 10);
    assert_eq!(hits.len(), 1);
}

#[test]
fn workspace_jsonl_discover_falls_back_to_directory_scan() {
    let root = tempfile::tempdir().unwrap();
    let provider = WorkspaceJsonlProvider::new(root.path());
    // A directory whose name only loosely matches the workspace's basename,
    // simulating a provider whose own encoding disagrees with ours.
    std::fs::create_dir_all(root.path().join("legacy-demo-project-encoding")).unwrap();

    let discovered = provider.discover_session_directory(Path::new("/some/other/root/demo-project"));
    assert!(discovered.is_some());
}
