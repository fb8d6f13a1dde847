//! Archive assembly: one ZIP per run holding `chat.json`, `chat.html`,
//! `chat.md` and every file the messages reference.
//!
//! Assembly runs in a fixed order:
//!   1. resolve artifact commands into versions,
//!   2. write the JSON, HTML and Markdown documents,
//!   3. write artifact versions and extracted attachment text,
//!   4. collect remote blobs to fetch, deduplicated by archive path,
//!   5. fetch them all concurrently, reporting each blob as it arrives, and
//!      wait for every one to settle,
//!   6. fold successful blobs into the archive and encode the ZIP.
//!
//! A failed fetch only costs that one file; it is reported in
//! [`AssembledArchive::failures`].

use std::collections::{BTreeMap, HashSet};
use std::io::{Cursor, Write};

use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::contract::{BlobFetcher, StatusEvent, StatusSink};
use crate::message::Message;
use crate::paths::ArchivePath;
use crate::render::{HtmlRenderer, MarkdownRenderer, Renderer};
use crate::resolve::{resolve_embedded, resolve_file, ArtifactIndex};

pub const CHAT_JSON: &str = "chat.json";
pub const CHAT_HTML: &str = "chat.html";
pub const CHAT_MARKDOWN: &str = "chat.md";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to serialize messages: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to encode zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to write zip entry: {0}")]
    Io(#[from] std::io::Error),
}

/// Entries of an archive before encoding. Names are unique: the first
/// insertion under a name wins.
#[derive(Debug, Default)]
pub struct Archive {
    entries: BTreeMap<String, Vec<u8>>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Returns `false`, leaving the existing entry alone, when
    /// the name is taken.
    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> bool {
        let name = name.into();
        if self.entries.contains_key(&name) {
            warn!(entry = %name, "Archive entry already exists, keeping the first one");
            return false;
        }
        self.entries.insert(name, bytes.into());
        true
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode as a deflated ZIP with fixed entry timestamps.
    pub fn to_zip(&self) -> Result<Vec<u8>, ArchiveError> {
        // 1980-01-01T00:00:00, the earliest time a zip entry can carry.
        let fixed_time = DateTime::default();
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(fixed_time);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in &self.entries {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes)?;
        }
        let cursor = zip.finish()?;
        let bytes = cursor.into_inner();
        info!(entries = self.entries.len(), size = bytes.len(), "Encoded zip archive");
        Ok(bytes)
    }
}

/// A remote blob to fetch and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub path: ArchivePath,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub path: String,
    pub url: String,
    pub reason: String,
}

/// State of one export run. Created per call, never shared.
#[derive(Debug, Default)]
pub struct ExportRun {
    archive: Archive,
    targets: Vec<FetchTarget>,
    queued: HashSet<String>,
}

impl ExportRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a fetch unless the archive path is already written or queued.
    pub fn queue_fetch(&mut self, path: ArchivePath, url: &str) -> bool {
        let entry = path.entry_name();
        if self.archive.contains(&entry) || !self.queued.insert(entry) {
            debug!(path = %path, url, "Fetch target already queued");
            return false;
        }
        self.targets.push(FetchTarget {
            path,
            url: url.to_string(),
        });
        true
    }

    pub fn fetch_targets(&self) -> &[FetchTarget] {
        &self.targets
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    /// Write documents, artifacts and extracted attachments, and queue
    /// every remote blob the messages reference.
    pub fn plan(&mut self, messages: &[Message], artifacts: &ArtifactIndex) -> Result<(), ArchiveError> {
        self.archive
            .insert(CHAT_JSON, serde_json::to_vec_pretty(messages)?);
        self.archive
            .insert(CHAT_HTML, HtmlRenderer.render_document(messages, artifacts));
        self.archive.insert(
            CHAT_MARKDOWN,
            MarkdownRenderer.render_document(messages, artifacts),
        );

        for version in artifacts.versions() {
            self.archive
                .insert(version.path.entry_name(), version.body.as_bytes());
        }

        for message in messages {
            for attachment in &message.attachments {
                let path = ArchivePath::for_attachment(attachment);
                debug!(
                    id = %attachment.id,
                    name = %attachment.file_name,
                    file_type = attachment.file_type.as_deref().unwrap_or("unknown"),
                    has_content = attachment.extracted_content.is_some(),
                    has_preview = attachment.preview_url.is_some(),
                    "Processing attachment"
                );
                if let Some(content) = attachment.extracted_content.as_deref() {
                    let resolved = resolve_embedded(attachment.file_type.as_deref(), None, content);
                    self.archive.insert(path.entry_name(), resolved.payload);
                } else if let Some(url) = attachment.preview_url.as_deref() {
                    self.queue_fetch(path, url);
                }
            }

            for file in message.all_files() {
                let resolution = resolve_file(file);
                match resolution.url {
                    Some(url) if resolution.needs_fetch => {
                        self.queue_fetch(resolution.path, &url);
                    }
                    _ => warn!(file = %file.file_name, "No URL found for file"),
                }
            }
        }

        info!(
            entries = self.archive.len(),
            fetch_targets = self.targets.len(),
            "Planned archive contents"
        );
        Ok(())
    }
}

/// Result of [`assemble`].
#[derive(Debug)]
pub struct AssembledArchive {
    pub archive: Archive,
    pub zip: Vec<u8>,
    /// Fetched blobs that made it into the archive.
    pub included: usize,
    /// Fetches issued.
    pub attempted: usize,
    pub failures: Vec<FetchFailure>,
    pub skipped_updates: usize,
}

/// Build the archive for `messages`, fetching every referenced blob.
pub async fn assemble<F, S>(
    messages: &[Message],
    fetcher: &F,
    status: &S,
) -> Result<AssembledArchive, ArchiveError>
where
    F: BlobFetcher + ?Sized,
    S: StatusSink + ?Sized,
{
    let artifacts = ArtifactIndex::resolve(messages);
    let mut run = ExportRun::new();
    run.plan(messages, &artifacts)?;

    let targets = std::mem::take(&mut run.targets);
    let attempted = targets.len();
    info!(count = attempted, "Found unique files to download");

    let fetches = targets.iter().map(|target| async move {
        debug!(path = %target.path, url = %target.url, "Downloading file");
        let result = fetcher.fetch(&target.url).await;
        if result.is_ok() {
            status.emit(StatusEvent::progress(format!(
                "Downloaded {}...",
                target.path.file_name()
            )));
        }
        (target, result)
    });
    let results = join_all(fetches).await;

    let mut included = 0;
    let mut failures = Vec::new();
    for (target, result) in results {
        match result {
            Ok(bytes) => {
                if run.archive.insert(target.path.entry_name(), bytes) {
                    included += 1;
                }
            }
            Err(e) => {
                error!(path = %target.path, url = %target.url, error = %e, "Failed to download file");
                failures.push(FetchFailure {
                    path: target.path.entry_name(),
                    url: target.url.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(included, attempted, "All downloads settled, creating ZIP");
    status.emit(StatusEvent::progress("Creating ZIP file..."));
    let zip = run.archive.to_zip()?;

    Ok(AssembledArchive {
        archive: run.archive,
        zip,
        included,
        attempted,
        failures,
        skipped_updates: artifacts.skipped(),
    })
}
