//! Canonical message records produced by the normalizer.
//!
//! These types are what `chat.json` contains and what the renderers and the
//! archive assembler consume. They carry no reference back to the snapshot
//! they were built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a message. The snapshot only ever uses these two tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Human,
    Assistant,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Human => "human",
            Sender::Assistant => "assistant",
        }
    }

    /// Label shown in rendered documents.
    pub fn label(&self) -> &'static str {
        match self {
            Sender::Human => "Human",
            Sender::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub created_at: DateTime<Utc>,
    pub parent_id: Option<String>,
    /// First `text` content item, if any.
    pub text: Option<String>,
    pub content: Vec<ContentItem>,
    pub attachments: Vec<Attachment>,
    pub files: Vec<FileRef>,
    pub files_v2: Vec<FileRef>,
}

impl Message {
    /// `files` followed by `files_v2`.
    pub fn all_files(&self) -> impl Iterator<Item = &FileRef> {
        self.files.iter().chain(self.files_v2.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text { text: String },
    ToolUse(ArtifactCommand),
    /// Any other content kind. Kept so the JSON export shows it existed.
    Other { kind: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactAction {
    Create,
    Update,
}

/// One command against an artifact, as issued by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactCommand {
    pub artifact_id: String,
    pub action: ArtifactAction,
    /// Declared MIME-like type, e.g. `application/vnd.ant.code`.
    pub declared_type: Option<String>,
    pub language: Option<String>,
    pub title: Option<String>,
    /// Full body, present on `create`.
    pub body: Option<String>,
    pub old_str: Option<String>,
    pub new_str: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ArtifactCommand {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.artifact_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub file_name: String,
    pub file_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub extracted_content: Option<String>,
    pub preview_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Other,
}

impl FileKind {
    pub fn from_declared(kind: Option<&str>) -> Self {
        match kind {
            Some("image") => FileKind::Image,
            _ => FileKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    pub kind: FileKind,
    pub uuid: Option<String>,
    pub file_name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub document_url: Option<String>,
    pub preview_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl FileRef {
    /// Best remote reference: document asset, then preview, then thumbnail.
    pub fn best_url(&self) -> Option<&str> {
        self.document_url
            .as_deref()
            .or(self.preview_url.as_deref())
            .or(self.thumbnail_url.as_deref())
    }
}
