//! Turns matched snapshot objects into [`Message`] records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::message::{
    ArtifactAction, ArtifactCommand, Attachment, ContentItem, FileKind, FileRef, Message, Sender,
};
use crate::tree_search::{search, HasIdentifier};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown sender `{0}`")]
    UnknownSender(String),
    #[error("invalid creation timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Parse an instant given either as an RFC 3339 string or as integer epoch
/// milliseconds.
pub fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => s.parse::<DateTime<Utc>>().ok(),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn lenient_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_instant))
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[derive(Deserialize)]
struct RawMessage {
    uuid: String,
    sender: String,
    #[serde(default)]
    created_at: Value,
    #[serde(default)]
    parent_message_uuid: Option<String>,
    content: Vec<Value>,
    #[serde(default)]
    attachments: Option<Vec<RawAttachment>>,
    #[serde(default)]
    files: Option<Vec<RawFile>>,
    #[serde(default)]
    files_v2: Option<Vec<RawFile>>,
}

#[derive(Deserialize)]
struct RawAttachment {
    id: String,
    file_name: String,
    #[serde(default, deserialize_with = "non_empty")]
    file_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_instant")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "non_empty")]
    extracted_content: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    preview_url: Option<String>,
}

#[derive(Deserialize)]
struct RawFile {
    #[serde(default)]
    file_kind: Option<String>,
    #[serde(default)]
    file_uuid: Option<String>,
    file_name: String,
    #[serde(default, deserialize_with = "lenient_instant")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "non_empty")]
    preview_url: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    thumbnail_url: Option<String>,
    #[serde(default)]
    document_asset: Option<RawAsset>,
}

#[derive(Deserialize)]
struct RawAsset {
    #[serde(default, deserialize_with = "non_empty")]
    url: Option<String>,
}

impl From<RawAttachment> for Attachment {
    fn from(raw: RawAttachment) -> Self {
        Attachment {
            id: raw.id,
            file_name: raw.file_name,
            file_type: raw.file_type,
            created_at: raw.created_at,
            extracted_content: raw.extracted_content,
            preview_url: raw.preview_url,
        }
    }
}

impl From<RawFile> for FileRef {
    fn from(raw: RawFile) -> Self {
        FileRef {
            kind: FileKind::from_declared(raw.file_kind.as_deref()),
            uuid: raw.file_uuid,
            file_name: raw.file_name,
            created_at: raw.created_at,
            document_url: raw.document_asset.and_then(|asset| asset.url),
            preview_url: raw.preview_url,
            thumbnail_url: raw.thumbnail_url,
        }
    }
}

fn parse_sender(sender: &str) -> Result<Sender, NormalizeError> {
    match sender {
        "human" => Ok(Sender::Human),
        "assistant" => Ok(Sender::Assistant),
        other => Err(NormalizeError::UnknownSender(other.to_string())),
    }
}

/// Build a [`Message`] from one message-shaped snapshot object.
pub fn normalize(raw: &Value) -> Result<Message, NormalizeError> {
    let parsed = RawMessage::deserialize(raw)?;
    let sender = parse_sender(&parsed.sender)?;
    let created_at = parse_instant(&parsed.created_at)
        .ok_or_else(|| NormalizeError::InvalidTimestamp(parsed.created_at.to_string()))?;

    let content: Vec<ContentItem> = parsed
        .content
        .iter()
        .map(|item| content_item(item, created_at))
        .collect();
    let text = content.iter().find_map(|item| match item {
        ContentItem::Text { text } => Some(text.clone()),
        _ => None,
    });

    let message = Message {
        id: parsed.uuid,
        sender,
        created_at,
        parent_id: parsed.parent_message_uuid.filter(|id| !id.is_empty()),
        text,
        content,
        attachments: map_all(parsed.attachments),
        files: map_all(parsed.files),
        files_v2: map_all(parsed.files_v2),
    };
    debug!(
        id = %message.id,
        sender = message.sender.as_str(),
        items = message.content.len(),
        attachments = message.attachments.len(),
        files = message.files.len() + message.files_v2.len(),
        "Normalized message"
    );
    Ok(message)
}

fn map_all<R, T: From<R>>(raw: Option<Vec<R>>) -> Vec<T> {
    raw.unwrap_or_default().into_iter().map(T::from).collect()
}

fn content_item(item: &Value, message_time: DateTime<Utc>) -> ContentItem {
    match item.get("type").and_then(Value::as_str) {
        Some("text") => ContentItem::Text {
            text: item
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        Some("tool_use") => match artifact_command(item, message_time) {
            Some(command) => ContentItem::ToolUse(command),
            None => ContentItem::Other {
                kind: "tool_use".to_string(),
            },
        },
        Some(kind) => ContentItem::Other {
            kind: kind.to_string(),
        },
        None => ContentItem::Other {
            kind: "unknown".to_string(),
        },
    }
}

fn artifact_command(item: &Value, message_time: DateTime<Utc>) -> Option<ArtifactCommand> {
    if item.get("name").and_then(Value::as_str) != Some("artifacts") {
        return None;
    }
    let input = item.get("input")?;
    let field = |key: &str| input.get(key).and_then(Value::as_str).map(str::to_string);

    let artifact_id = field("id").filter(|id| !id.is_empty())?;
    let action = match input.get("command").and_then(Value::as_str) {
        Some("create") => ArtifactAction::Create,
        Some("update") => ArtifactAction::Update,
        other => {
            debug!(artifact_id = %artifact_id, command = ?other, "Ignoring unsupported artifact command");
            return None;
        }
    };
    let timestamp = item
        .get("stop_timestamp")
        .and_then(parse_instant)
        .unwrap_or(message_time);

    Some(ArtifactCommand {
        artifact_id,
        action,
        declared_type: field("type"),
        language: field("language").filter(|l| !l.is_empty()),
        title: field("title").filter(|t| !t.is_empty()),
        body: field("content"),
        old_str: field("old_str"),
        new_str: field("new_str"),
        timestamp,
    })
}

/// Search `root` and normalize every match, dropping the ones that fail.
pub fn discover_messages(root: &Value, max_depth: usize) -> Vec<Message> {
    let mut messages = Vec::new();
    for raw in search(root, max_depth) {
        match normalize(raw) {
            Ok(message) => messages.push(message),
            Err(e) => {
                warn!(id = raw.identifier().unwrap_or_default(), error = %e, "Dropping malformed message");
            }
        }
    }
    info!(count = messages.len(), "Discovered messages in snapshot");
    messages
}
