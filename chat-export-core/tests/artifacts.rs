use chat_export_core::message::{ArtifactAction, ArtifactCommand, ContentItem, Message, Sender};
use chat_export_core::mime::{artifact_extension, extension_for_language, sniff_extension};
use chat_export_core::resolve::{ArtifactIndex, ArtifactOutcome, ArtifactTable, SkipReason};
use chrono::{DateTime, TimeZone, Utc};

fn at(second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, second).unwrap()
}

fn create(id: &str, language: Option<&str>, body: &str, second: u32) -> ArtifactCommand {
    ArtifactCommand {
        artifact_id: id.to_string(),
        action: ArtifactAction::Create,
        declared_type: None,
        language: language.map(str::to_string),
        title: None,
        body: Some(body.to_string()),
        old_str: None,
        new_str: None,
        timestamp: at(second),
    }
}

fn update(id: &str, old: &str, new: &str, second: u32) -> ArtifactCommand {
    ArtifactCommand {
        artifact_id: id.to_string(),
        action: ArtifactAction::Update,
        declared_type: None,
        language: None,
        title: None,
        body: None,
        old_str: Some(old.to_string()),
        new_str: Some(new.to_string()),
        timestamp: at(second),
    }
}

#[test]
fn test_update_replaces_every_literal_occurrence() {
    let mut table = ArtifactTable::new();
    table.apply(&create("doc", Some("markdown"), "a.b.c", 1));

    let ArtifactOutcome::Installed(version) = table.apply(&update("doc", ".", "-", 2)) else {
        panic!("update after create should install a version");
    };
    assert_eq!(version.body, "a-b-c");
    assert_eq!(version.version, 1);
    assert_eq!(version.extension, "md", "Update keeps the extension of the created version");
    assert_eq!(version.language.as_deref(), Some("markdown"));
    assert_eq!(
        version.path.entry_name(),
        format!("files/artifacts/doc_{}.md", at(2).timestamp_millis())
    );
}

#[test]
fn test_update_without_create_is_skipped() {
    let mut table = ArtifactTable::new();
    let outcome = table.apply(&update("ghost", "x", "y", 1));

    assert_eq!(outcome, ArtifactOutcome::Skipped(SkipReason::MissingBaseline));
    assert!(table.latest("ghost").is_none());
}

#[test]
fn test_updates_chain_on_latest_version() {
    let mut table = ArtifactTable::new();
    table.apply(&create("app", Some("python"), "x = 1\ny = 2", 1));
    table.apply(&update("app", "1", "10", 2));
    table.apply(&update("app", "2", "20", 3));

    let latest = table.latest("app").expect("artifact should exist");
    assert_eq!(latest.body, "x = 10\ny = 20");
    assert_eq!(latest.version, 2);
}

#[test]
fn test_index_records_outcome_per_content_item() {
    let messages = vec![Message {
        id: "m1".to_string(),
        sender: Sender::Assistant,
        created_at: at(0),
        parent_id: None,
        text: Some("hi".to_string()),
        content: vec![
            ContentItem::Text {
                text: "hi".to_string(),
            },
            ContentItem::ToolUse(update("later", "a", "b", 1)),
            ContentItem::ToolUse(create("later", None, "print('a')", 2)),
        ],
        attachments: vec![],
        files: vec![],
        files_v2: vec![],
    }];

    let index = ArtifactIndex::resolve(&messages);
    assert_eq!(index.skipped(), 1);
    assert_eq!(index.versions().len(), 1);
    assert!(index.get("m1", 0).is_none());
    assert!(matches!(
        index.get("m1", 1),
        Some(ArtifactOutcome::Skipped(SkipReason::MissingBaseline))
    ));
    assert!(matches!(
        index.get("m1", 2),
        Some(ArtifactOutcome::Installed(v)) if v.extension == "txt"
    ));
}

#[test]
fn test_extension_policy() {
    assert_eq!(
        artifact_extension(Some("text/html"), Some("python"), "print(1)"),
        "html",
        "Declared type beats language"
    );
    assert_eq!(artifact_extension(None, Some("python"), ""), "py");
    assert_eq!(artifact_extension(None, None, "just some words"), "txt");
    assert_eq!(
        artifact_extension(None, None, "<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>"),
        "svg"
    );
    assert_eq!(
        artifact_extension(Some("application/vnd.ant.react"), None, ""),
        "jsx"
    );
    assert_eq!(
        artifact_extension(Some("application/vnd.ant.code"), Some("rust"), ""),
        "rs",
        "Unregistered declared type falls through to language"
    );
}

#[test]
fn test_language_and_sniffing() {
    assert_eq!(extension_for_language("TypeScript"), Some("ts"));
    assert_eq!(extension_for_language("rs"), Some("rs"));
    assert_eq!(extension_for_language("klingon"), None);

    assert_eq!(sniff_extension("<!DOCTYPE html><html></html>"), Some("html"));
    assert_eq!(sniff_extension("import React from 'react';"), Some("js"));
    assert_eq!(sniff_extension("def main():\n    pass"), Some("py"));
    assert_eq!(sniff_extension("public class Main {}"), Some("java"));
    assert_eq!(sniff_extension("hello"), None);
}

#[test]
fn test_versions_sharing_a_timestamp_get_distinct_paths() {
    let mut table = ArtifactTable::new();
    let ArtifactOutcome::Installed(first) = table.apply(&create("a", Some("python"), "x = 1", 0))
    else {
        panic!("create should install a version");
    };
    let ArtifactOutcome::Installed(second) = table.apply(&update("a", "1", "2", 0)) else {
        panic!("update should install a version");
    };
    let ArtifactOutcome::Installed(third) = table.apply(&update("a", "2", "3", 0)) else {
        panic!("update should install a version");
    };

    let ms = at(0).timestamp_millis();
    assert_eq!(first.path.entry_name(), format!("files/artifacts/a_{ms}.py"));
    assert_eq!(second.path.entry_name(), format!("files/artifacts/a_{ms}_v1.py"));
    assert_eq!(third.path.entry_name(), format!("files/artifacts/a_{ms}_v2.py"));
}
