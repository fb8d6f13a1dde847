use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chat_export_core::config::ExportConfig;
use chat_export_core::contract::{
    MockBlobFetcher, MockDownloadSink, MockStatusSink, SinkError, StatusEvent, StatusState,
};
use chat_export_core::export::{archive_file_name, export, ExportError, NO_MESSAGES};
use chrono::{TimeZone, Utc};
use serde_json::json;

/// Status sink mock that records every event it receives.
fn recording_status() -> (MockStatusSink, Arc<Mutex<Vec<StatusEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = Arc::clone(&events);
    let mut status = MockStatusSink::new();
    status
        .expect_emit()
        .returning(move |event| sink_events.lock().unwrap().push(event));
    (status, events)
}

fn config(title: &str) -> ExportConfig {
    ExportConfig {
        title: Some(title.to_string()),
        ..ExportConfig::default()
    }
}

#[tokio::test]
async fn test_export_saves_archive_and_reports() {
    let snapshot = json!({
        "messages": [
            {"uuid": "m1", "sender": "human", "created_at": "2024-05-01T12:00:00Z",
             "content": [{"type": "text", "text": "Show me a picture"}],
             "files": [{"file_kind": "image", "file_name": "cat.png", "thumbnail_url": "/thumb/cat"}]},
            {"uuid": "m2", "sender": "assistant", "created_at": "2024-05-01T12:00:05Z",
             "content": [{"type": "text", "text": "Nice cat"}]}
        ]
    });

    let mut fetcher = MockBlobFetcher::new();
    fetcher
        .expect_fetch()
        .withf(|url| url.to_string() == "/thumb/cat")
        .times(1)
        .returning(|_| Ok(vec![0x89, b'P', b'N', b'G']));

    let mut sink = MockDownloadSink::new();
    sink.expect_save()
        .withf(|name, payload| {
            name.starts_with("cat-pictures-") && name.ends_with(".zip") && !payload.is_empty()
        })
        .times(1)
        .returning(|name, _| Ok(PathBuf::from("/exports").join(name)));

    let (status, events) = recording_status();

    let report = export(&config("Cat pictures"), &snapshot, &fetcher, &status, &sink)
        .await
        .expect("export should succeed");

    assert_eq!(report.messages, 2);
    assert_eq!(report.files_included, 1);
    assert_eq!(report.files_attempted, 1);
    assert!(report.failures.is_empty());
    assert_eq!(report.saved_to, PathBuf::from("/exports").join(&report.file_name));

    let events = events.lock().unwrap();
    assert_eq!(events.first().unwrap().text, "Searching for messages...");
    assert!(events.iter().any(|e| e.text == "Downloaded cat.png..."));
    assert!(events.iter().any(|e| e.text == "Creating ZIP file..."));
    assert_eq!(
        events.last().unwrap(),
        &StatusEvent::success("Download ready! (1 files included)")
    );
}

#[tokio::test]
async fn test_export_without_messages_fails_early() {
    let mut fetcher = MockBlobFetcher::new();
    fetcher.expect_fetch().never();
    let mut sink = MockDownloadSink::new();
    sink.expect_save().never();
    let (status, events) = recording_status();

    let result = export(
        &ExportConfig::default(),
        &json!({"page": {"title": "Settings"}}),
        &fetcher,
        &status,
        &sink,
    )
    .await;

    assert!(matches!(result, Err(ExportError::NoMessages)));
    let events = events.lock().unwrap();
    assert_eq!(events.last().unwrap(), &StatusEvent::error(NO_MESSAGES));
}

#[tokio::test]
async fn test_export_reports_sink_failure() {
    let snapshot = json!([{"uuid": "m1", "sender": "human", "created_at": "2024-05-01T12:00:00Z", "content": []}]);

    let fetcher = MockBlobFetcher::new();
    let mut sink = MockDownloadSink::new();
    sink.expect_save()
        .returning(|_, _| Err(SinkError::Rejected("user cancelled".to_string())));
    let (status, events) = recording_status();

    let result = export(&ExportConfig::default(), &snapshot, &fetcher, &status, &sink).await;

    assert!(matches!(result, Err(ExportError::Sink(_))));
    let events = events.lock().unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.state, StatusState::Error);
    assert_eq!(last.text, "Error creating download package");
    assert!(events.iter().all(|e| e.state != StatusState::Success));
}

#[test]
fn test_archive_file_name() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 15).unwrap();
    assert_eq!(
        archive_file_name(Some("Rust: Borrowing & Lifetimes"), now),
        "rust--borrowing---lifetimes-2024-05-01T09-30-15.zip"
    );
    assert_eq!(archive_file_name(None, now), "chat-2024-05-01T09-30-15.zip");
    assert_eq!(archive_file_name(Some("   "), now), "chat-2024-05-01T09-30-15.zip");
}
