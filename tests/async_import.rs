//! Background file reads through the import queue.

use amr_dashboard::{
    read_import, DashboardConfig, DashboardState, DocumentKind, ImportQueue, SessionStore,
};
use std::io::Write;
use std::time::{Duration, Instant};

const MAP: &str = r#"{
    "nodeKeys": ["key", "x", "y", "type", "content"],
    "lineKeys": ["startNode", "endNode"],
    "nodeArr": [["A", 0, 0, 0, "A"], ["B", 1000, 0, 0, "B"]],
    "lineArr": [["A", "B"]],
    "width": 2000,
    "height": 2000
}"#;

fn temp_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn read_import_captures_text_and_name() {
    let file = temp_file(MAP);
    let raw = read_import(DocumentKind::Map, file.path()).await;
    assert_eq!(raw.kind, DocumentKind::Map);
    assert_eq!(
        raw.file_name,
        file.path().file_name().unwrap().to_string_lossy()
    );
    assert_eq!(raw.contents.as_deref(), Ok(MAP));
}

#[tokio::test]
async fn read_import_reports_missing_file_without_failing() {
    let dir = tempfile::tempdir().unwrap();
    let raw = read_import(DocumentKind::Security, dir.path().join("missing.json")).await;
    assert_eq!(raw.file_name, "missing.json");
    assert!(raw.contents.is_err());
}

fn poll_until<T>(mut poll: impl FnMut() -> Option<T>) -> T {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(value) = poll() {
            return value;
        }
        assert!(Instant::now() < deadline, "background import timed out");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn queue_delivers_finished_reads() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut queue = ImportQueue::new(runtime.handle().clone());
    let file = temp_file(MAP);

    queue.request(DocumentKind::Map, file.path().to_path_buf());
    assert!(queue.is_loading());

    let finished = poll_until(|| {
        let done = queue.poll();
        (!done.is_empty()).then_some(done)
    });
    assert_eq!(finished.len(), 1);
    assert!(!queue.is_loading());
}

#[test]
fn state_applies_background_imports() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut state = DashboardState::new(DashboardConfig::default(), SessionStore::in_memory())
        .with_import_runtime(runtime.handle().clone());
    let good = temp_file(MAP);
    let bad = temp_file("{ definitely not json");

    assert!(state.request_import(DocumentKind::Map, good.path().to_path_buf()));
    assert!(state.is_loading());
    poll_until(|| (state.poll_imports() == 1).then_some(()));
    assert_eq!(state.document().map(|d| d.nodes().len()), Some(2));
    assert!(!state.is_loading());

    assert!(state.request_import(DocumentKind::Map, bad.path().to_path_buf()));
    poll_until(|| {
        state.poll_imports();
        (!state.is_loading()).then_some(())
    });
    assert!(state
        .last_error()
        .is_some_and(|e| e.starts_with("Error parsing map file")));
    // the earlier document survives the failed import
    assert_eq!(state.document().map(|d| d.nodes().len()), Some(2));
}

#[test]
fn request_without_runtime_is_refused() {
    let mut state = DashboardState::new(DashboardConfig::default(), SessionStore::in_memory());
    assert!(!state.request_import(DocumentKind::Map, "site.json".into()));
    assert_eq!(state.poll_imports(), 0);
}
