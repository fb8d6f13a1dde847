use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{read_dir, write, File};
use std::io::Read;
use tempfile::{tempdir, NamedTempFile};

const SNAPSHOT: &str = r#"{
  "props": {
    "conversation": {
      "name": "Greetings",
      "chat_messages": [
        {
          "uuid": "m2",
          "sender": "assistant",
          "created_at": "2024-05-01T12:00:10Z",
          "content": [
            {"type": "text", "text": "Hi"},
            {
              "type": "tool_use",
              "name": "artifacts",
              "input": {"id": "snippet", "command": "create", "language": "python", "content": "print(1)"}
            }
          ]
        },
        {
          "uuid": "m1",
          "sender": "human",
          "created_at": "2024-05-01T12:00:00Z",
          "content": [{"type": "text", "text": "Hello"}],
          "attachments": [
            {"id": "a1", "file_name": "notes.txt", "file_type": "text/plain", "extracted_content": "remember the milk"}
          ]
        }
      ]
    }
  }
}"#;

/// Snapshot file whose messages reference no remote files.
fn create_snapshot(contents: &str) -> NamedTempFile {
    let snapshot = NamedTempFile::new().expect("Creating temp snapshot failed");
    write(snapshot.path(), contents).expect("Writing temp snapshot failed");
    snapshot
}

#[test]
fn list_prints_discovered_messages() {
    let snapshot = create_snapshot(SNAPSHOT);
    let mut cmd = Command::cargo_bin("chat-export").expect("Binary exists");

    cmd.arg("list")
        .arg("--snapshot")
        .arg(snapshot.path())
        .env_remove("CHAT_EXPORT_ORIGIN");

    cmd.assert()
        .success()
        .stdout(
            predicate::str::contains("1. [human] 2024-05-01 12:00:00 Hello (attachments: 1, files: 0)")
                .and(predicate::str::contains("2. [assistant]"))
                .and(predicate::str::contains("2 messages")),
        );
}

#[test]
fn export_writes_zip_into_output_dir() {
    let snapshot = create_snapshot(SNAPSHOT);
    let out = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("chat-export").expect("Binary exists");

    cmd.arg("export")
        .arg("--snapshot")
        .arg(snapshot.path())
        .arg("--title")
        .arg("Greetings!")
        .arg("--output-dir")
        .arg(out.path());

    cmd.assert()
        .success()
        .stdout(
            predicate::str::contains("Download ready! (0 files included)")
                .and(predicate::str::contains("exit")),
        );

    let written: Vec<_> = read_dir(out.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(written.len(), 1, "Exactly one archive should be written");
    let name = written[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("greetings--"), "Unexpected name {name}");
    assert!(name.ends_with(".zip"));

    let mut archive = zip::ZipArchive::new(File::open(&written[0]).unwrap()).unwrap();
    for entry in ["chat.json", "chat.html", "chat.md", "files/attachments/notes_a1.txt"] {
        assert!(archive.by_name(entry).is_ok(), "Missing {entry}");
    }
    let mut notes = String::new();
    archive
        .by_name("files/attachments/notes_a1.txt")
        .unwrap()
        .read_to_string(&mut notes)
        .unwrap();
    assert_eq!(notes, "remember the milk");
}

#[test]
fn export_save_as_uses_given_path() {
    let snapshot = create_snapshot(SNAPSHOT);
    let out = tempdir().unwrap();
    let target = out.path().join("nested").join("mine.zip");
    let mut cmd = Command::cargo_bin("chat-export").expect("Binary exists");

    cmd.arg("export")
        .arg("--snapshot")
        .arg(snapshot.path())
        .arg("--save-as")
        .arg(&target);

    cmd.assert().success();
    assert!(target.exists());
}

#[test]
fn export_fails_without_messages() {
    let snapshot = create_snapshot(r#"{"page": {"title": "Settings"}}"#);
    let out = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("chat-export").expect("Binary exists");

    cmd.arg("export")
        .arg("--snapshot")
        .arg(snapshot.path())
        .arg("--output-dir")
        .arg(out.path());

    cmd.assert().failure().stdout(predicate::str::contains(
        "No messages found. You should open an existing chat to download messages.",
    ));
    assert_eq!(read_dir(out.path()).unwrap().count(), 0);
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use chat_export::cli::{run, Cli, Commands};

    // A missing snapshot makes the run fail, but it still traces.
    let cli = Cli {
        command: Commands::List {
            snapshot: std::path::PathBuf::from("does-not-exist.json"),
            config: None,
        },
    };

    let result = run(cli).await;
    assert!(result.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
    assert!(
        event_msgs.iter().any(|msg| msg.contains("exit")),
        "Expected an 'exit' trace event, got: {:?}",
        event_msgs
    );
}
