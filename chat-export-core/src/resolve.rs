//! Content resolvers: decide what each attachment, file reference and
//! artifact command turns into inside the archive.
//!
//! Embedded content is dispatched on its declared type, file references on
//! their kind. Declared types always win; sniffing the content is only a
//! fallback (see [`crate::mime::artifact_extension`]).
//!
//! Artifacts are versioned per run: `create` installs version 0 and every
//! `update` rewrites the latest version with a literal search-and-replace.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::message::{ArtifactAction, ArtifactCommand, ContentItem, FileRef, Message};
use crate::mime::{artifact_extension, DEFAULT_EXTENSION};
use crate::paths::{ArchivePath, Folder};

const JSON_TYPE: &str = "application/json";
const CODE_TYPE: &str = "application/vnd.ant.code";

/// Handler selected for an embedded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedKind {
    Json,
    Code,
    Text,
}

impl EmbeddedKind {
    pub fn for_declared_type(declared_type: Option<&str>) -> Self {
        match declared_type {
            Some(JSON_TYPE) => EmbeddedKind::Json,
            Some(CODE_TYPE) => EmbeddedKind::Code,
            _ => EmbeddedKind::Text,
        }
    }
}

/// Materialized embedded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    /// Extension including the leading dot.
    pub extension: String,
    pub payload: String,
}

/// Extension (with dot) the handler for `declared_type` picks.
pub fn embedded_extension(declared_type: Option<&str>, language: Option<&str>) -> String {
    match EmbeddedKind::for_declared_type(declared_type) {
        EmbeddedKind::Json => ".json".to_string(),
        EmbeddedKind::Code => format!(".{}", language.unwrap_or(DEFAULT_EXTENSION)),
        EmbeddedKind::Text => format!(".{DEFAULT_EXTENSION}"),
    }
}

pub fn resolve_embedded(
    declared_type: Option<&str>,
    language: Option<&str>,
    content: &str,
) -> ResolvedContent {
    let kind = EmbeddedKind::for_declared_type(declared_type);
    let payload = match kind {
        EmbeddedKind::Json => pretty_json(content),
        EmbeddedKind::Code | EmbeddedKind::Text => content.to_string(),
    };
    debug!(?kind, size = payload.len(), "Resolved embedded content");
    ResolvedContent {
        extension: embedded_extension(declared_type, language),
        payload,
    }
}

fn pretty_json(content: &str) -> String {
    serde_json::from_str::<Value>(content)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| content.to_string())
}

/// What to do with one file reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResolution {
    pub path: ArchivePath,
    /// Extension from the declared name, with dot; empty when there is none.
    pub extension: String,
    pub url: Option<String>,
    pub needs_fetch: bool,
}

pub fn resolve_file(file: &FileRef) -> FileResolution {
    let url = file.best_url().map(str::to_string);
    let extension = crate::paths::extension_from_name(&file.file_name)
        .unwrap_or_default()
        .to_string();
    let needs_fetch = url.is_some();
    let path = ArchivePath::for_file(file);
    debug!(
        file = %file.file_name,
        kind = ?file.kind,
        path = %path,
        needs_fetch,
        "Resolved file reference"
    );
    FileResolution {
        path,
        extension,
        url,
        needs_fetch,
    }
}

/// One stored version of an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactVersion {
    pub artifact_id: String,
    pub version: usize,
    pub timestamp_ms: i64,
    /// Extension without dot.
    pub extension: String,
    pub language: Option<String>,
    pub body: String,
    pub path: ArchivePath,
}

/// Why an artifact command produced no file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `update` for an artifact that was never created in this run.
    MissingBaseline,
    /// `create` without a body.
    MissingBody,
    /// `update` without text to replace.
    MissingOldText,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::MissingBaseline => "no previous version found",
            SkipReason::MissingBody => "artifact has no content",
            SkipReason::MissingOldText => "update has no text to replace",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    Installed(ArtifactVersion),
    Skipped(SkipReason),
}

/// Latest version of every artifact seen so far in a run, plus every archive
/// name handed out, so no two versions share an entry.
#[derive(Debug, Default)]
pub struct ArtifactTable {
    latest: HashMap<String, ArtifactVersion>,
    taken: HashSet<String>,
}

impl ArtifactTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self, artifact_id: &str) -> Option<&ArtifactVersion> {
        self.latest.get(artifact_id)
    }

    pub fn apply(&mut self, command: &ArtifactCommand) -> ArtifactOutcome {
        let outcome = match command.action {
            ArtifactAction::Create => self.create(command),
            ArtifactAction::Update => self.update(command),
        };
        match &outcome {
            ArtifactOutcome::Installed(version) => {
                debug!(
                    artifact_id = %version.artifact_id,
                    version = version.version,
                    path = %version.path,
                    "Installed artifact version"
                );
                self.taken.insert(version.path.entry_name());
                self.latest
                    .insert(version.artifact_id.clone(), version.clone());
            }
            ArtifactOutcome::Skipped(reason) => {
                warn!(
                    artifact_id = %command.artifact_id,
                    action = ?command.action,
                    %reason,
                    "Skipping artifact command"
                );
            }
        }
        outcome
    }

    fn create(&self, command: &ArtifactCommand) -> ArtifactOutcome {
        let Some(body) = command.body.as_deref() else {
            return ArtifactOutcome::Skipped(SkipReason::MissingBody);
        };
        let extension = artifact_extension(
            command.declared_type.as_deref(),
            command.language.as_deref(),
            body,
        );
        ArtifactOutcome::Installed(ArtifactVersion {
            artifact_id: command.artifact_id.clone(),
            version: 0,
            timestamp_ms: command.timestamp.timestamp_millis(),
            extension: extension.to_string(),
            language: command.language.clone(),
            body: body.to_string(),
            path: self.version_path(&command.artifact_id, command.timestamp, extension, 0),
        })
    }

    fn update(&self, command: &ArtifactCommand) -> ArtifactOutcome {
        let Some(previous) = self.latest.get(&command.artifact_id) else {
            return ArtifactOutcome::Skipped(SkipReason::MissingBaseline);
        };
        let Some(old_str) = command.old_str.as_deref().filter(|s| !s.is_empty()) else {
            return ArtifactOutcome::Skipped(SkipReason::MissingOldText);
        };
        let new_str = command.new_str.as_deref().unwrap_or_default();

        let version = previous.version + 1;
        ArtifactOutcome::Installed(ArtifactVersion {
            artifact_id: previous.artifact_id.clone(),
            version,
            timestamp_ms: command.timestamp.timestamp_millis(),
            extension: previous.extension.clone(),
            language: previous.language.clone(),
            body: previous.body.replace(old_str, new_str),
            path: self.version_path(
                &previous.artifact_id,
                command.timestamp,
                &previous.extension,
                version,
            ),
        })
    }

    /// `{id}_{timestamp_ms}.{ext}`, or `{id}_{timestamp_ms}_v{n}.{ext}` with the
    /// first `n >= version` that is still free when the plain name is taken.
    fn version_path(
        &self,
        artifact_id: &str,
        timestamp: DateTime<Utc>,
        extension: &str,
        version: usize,
    ) -> ArchivePath {
        let path = ArchivePath::for_artifact(artifact_id, timestamp, extension);
        if !self.taken.contains(&path.entry_name()) {
            return path;
        }
        let millis = timestamp.timestamp_millis();
        (version..)
            .map(|n| {
                ArchivePath::new(
                    Folder::Artifacts,
                    &format!("{artifact_id}_{millis}_v{n}.{extension}"),
                )
            })
            .find(|candidate| !self.taken.contains(&candidate.entry_name()))
            .unwrap_or(path)
    }
}

/// Resolved artifact commands of a run, keyed by message id and content
/// item position.
#[derive(Debug, Default)]
pub struct ArtifactIndex {
    outcomes: HashMap<(String, usize), ArtifactOutcome>,
    installed: Vec<ArtifactVersion>,
    skipped: usize,
}

impl ArtifactIndex {
    /// Apply every artifact command in `messages`, in order, against a fresh
    /// table.
    pub fn resolve(messages: &[Message]) -> Self {
        let mut table = ArtifactTable::new();
        let mut index = ArtifactIndex::default();

        for message in messages {
            for (position, item) in message.content.iter().enumerate() {
                let ContentItem::ToolUse(command) = item else {
                    continue;
                };
                let outcome = table.apply(command);
                match &outcome {
                    ArtifactOutcome::Installed(version) => index.installed.push(version.clone()),
                    ArtifactOutcome::Skipped(_) => index.skipped += 1,
                }
                index
                    .outcomes
                    .insert((message.id.clone(), position), outcome);
            }
        }

        info!(
            versions = index.installed.len(),
            skipped = index.skipped,
            "Resolved artifact commands"
        );
        index
    }

    pub fn get(&self, message_id: &str, position: usize) -> Option<&ArtifactOutcome> {
        self.outcomes.get(&(message_id.to_string(), position))
    }

    /// Every installed version, in the order the commands were applied.
    pub fn versions(&self) -> &[ArtifactVersion] {
        &self.installed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
