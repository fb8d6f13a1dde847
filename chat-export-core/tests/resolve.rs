use chat_export_core::message::{Attachment, FileKind, FileRef};
use chat_export_core::paths::{ArchivePath, Folder};
use chat_export_core::resolve::{resolve_embedded, resolve_file, EmbeddedKind};

fn file(kind: FileKind, name: &str) -> FileRef {
    FileRef {
        kind,
        uuid: None,
        file_name: name.to_string(),
        created_at: None,
        document_url: None,
        preview_url: None,
        thumbnail_url: None,
    }
}

#[test]
fn test_json_content_is_pretty_printed() {
    let resolved = resolve_embedded(Some("application/json"), None, r#"{"a":1,"b":[true]}"#);
    assert_eq!(resolved.extension, ".json");
    assert_eq!(
        resolved.payload,
        "{\n  \"a\": 1,\n  \"b\": [\n    true\n  ]\n}"
    );
}

#[test]
fn test_invalid_json_is_kept_verbatim() {
    let resolved = resolve_embedded(Some("application/json"), None, "{not json");
    assert_eq!(resolved.payload, "{not json");
}

#[test]
fn test_default_handler_keeps_text() {
    let resolved = resolve_embedded(Some("text/csv"), None, "a,b\n1,2");
    assert_eq!(resolved.extension, ".txt");
    assert_eq!(resolved.payload, "a,b\n1,2");
    assert_eq!(EmbeddedKind::for_declared_type(None), EmbeddedKind::Text);
}

#[test]
fn test_code_handler_uses_language_extension() {
    let resolved = resolve_embedded(Some("application/vnd.ant.code"), Some("rs"), "fn main() {}");
    assert_eq!(resolved.extension, ".rs");
}

#[test]
fn test_file_url_priority() {
    let mut f = file(FileKind::Other, "paper.pdf");
    f.thumbnail_url = Some("/thumb".to_string());
    assert_eq!(resolve_file(&f).url.as_deref(), Some("/thumb"));

    f.preview_url = Some("/preview".to_string());
    assert_eq!(resolve_file(&f).url.as_deref(), Some("/preview"));

    f.document_url = Some("/document".to_string());
    let resolution = resolve_file(&f);
    assert_eq!(resolution.url.as_deref(), Some("/document"));
    assert!(resolution.needs_fetch);
    assert_eq!(resolution.extension, ".pdf");
    assert_eq!(resolution.path.entry_name(), "files/other/paper.pdf");
}

#[test]
fn test_file_without_url_is_not_fetched() {
    let resolution = resolve_file(&file(FileKind::Image, "cat.png"));
    assert_eq!(resolution.url, None);
    assert!(!resolution.needs_fetch);
    assert_eq!(resolution.path.folder(), Folder::Images);
}

#[test]
fn test_attachment_paths() {
    let mut attachment = Attachment {
        id: "att1".to_string(),
        file_name: "my notes.txt".to_string(),
        file_type: Some("text/plain".to_string()),
        created_at: None,
        extracted_content: Some("notes".to_string()),
        preview_url: None,
    };
    let path = ArchivePath::for_attachment(&attachment);
    assert_eq!(path.entry_name(), "files/attachments/my notes_att1.txt");
    assert_eq!(path.href(), "files/attachments/my%20notes_att1.txt");

    attachment.file_name = "data".to_string();
    attachment.file_type = Some("application/json".to_string());
    assert_eq!(
        ArchivePath::for_attachment(&attachment).entry_name(),
        "files/attachments/data_att1.json"
    );
}

#[test]
fn test_declared_names_cannot_escape_their_folder() {
    let path = ArchivePath::for_file(&file(FileKind::Other, "../../etc/passwd"));
    assert_eq!(path.entry_name(), "files/other/.._.._etc_passwd");
}
