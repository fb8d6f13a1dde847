//! Top-level pipeline: snapshot → messages → archive → download.
//!
//! [`export`] runs one complete export for a page snapshot:
//!   - walks the snapshot for message-shaped records and normalizes them
//!     (see [`crate::normalize::discover_messages`])
//!   - assembles the ZIP with documents, artifacts and fetched blobs
//!     (see [`crate::archive::assemble`])
//!   - hands the archive to a [`DownloadSink`] under a name derived from the
//!     page title and the current time
//!   - reports progress through a [`StatusSink`] the whole way
//!
//! # Error Handling
//! A run with no messages stops before anything is fetched. A failure to
//! encode or save the archive is reported with an error status event and
//! returned. Individual blob fetch failures are not errors; they are listed in
//! [`ExportReport::failures`].
//!
//! # Callable From
//! - The CLI crate, with the HTTP fetcher and a directory sink
//! - Integration tests, with the `mockall` doubles from [`crate::contract`]

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::archive::{assemble, ArchiveError, FetchFailure};
use crate::config::ExportConfig;
use crate::contract::{BlobFetcher, DownloadSink, SinkError, StatusEvent, StatusSink};
use crate::normalize::discover_messages;

pub const NO_MESSAGES: &str =
    "No messages found. You should open an existing chat to download messages.";
pub const PACKAGE_FAILED: &str = "Error creating download package";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no messages found in snapshot")]
    NoMessages,
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Summary of a finished export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub file_name: String,
    pub saved_to: PathBuf,
    pub messages: usize,
    pub files_included: usize,
    pub files_attempted: usize,
    pub failures: Vec<FetchFailure>,
    pub skipped_updates: usize,
}

/// `{title}-{timestamp}.zip`, with every character of the title outside
/// `[a-z0-9]` (after lowercasing) replaced by `-`.
pub fn archive_file_name(title: Option<&str>, now: DateTime<Utc>) -> String {
    let slug: String = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("chat")
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("{slug}-{}.zip", now.format("%Y-%m-%dT%H-%M-%S"))
}

pub async fn export<F, S, D>(
    config: &ExportConfig,
    root: &Value,
    fetcher: &F,
    status: &S,
    sink: &D,
) -> Result<ExportReport, ExportError>
where
    F: BlobFetcher + ?Sized,
    S: StatusSink + ?Sized,
    D: DownloadSink + ?Sized,
{
    config.trace_loaded();
    info!("[EXPORT] Starting export");
    status.emit(StatusEvent::progress("Searching for messages..."));

    let messages = discover_messages(root, config.max_depth);
    if messages.is_empty() {
        error!("[EXPORT] No messages found in snapshot");
        status.emit(StatusEvent::error(NO_MESSAGES));
        return Err(ExportError::NoMessages);
    }
    info!(count = messages.len(), "[EXPORT] Found messages");

    let assembled = match assemble(&messages, fetcher, status).await {
        Ok(assembled) => assembled,
        Err(e) => {
            error!(error = ?e, "[EXPORT] Failed to assemble archive");
            status.emit(StatusEvent::error(PACKAGE_FAILED));
            return Err(e.into());
        }
    };

    let file_name = archive_file_name(config.title.as_deref(), Utc::now());
    let saved_to = match sink.save(&file_name, &assembled.zip).await {
        Ok(path) => path,
        Err(e) => {
            error!(error = ?e, file = %file_name, "[EXPORT] Failed to save archive");
            status.emit(StatusEvent::error(PACKAGE_FAILED));
            return Err(e.into());
        }
    };

    info!(
        file = %file_name,
        saved_to = %saved_to.display(),
        included = assembled.included,
        attempted = assembled.attempted,
        failed = assembled.failures.len(),
        "[EXPORT] Archive saved"
    );
    status.emit(StatusEvent::success(format!(
        "Download ready! ({} files included)",
        assembled.included
    )));

    Ok(ExportReport {
        file_name,
        saved_to,
        messages: messages.len(),
        files_included: assembled.included,
        files_attempted: assembled.attempted,
        failures: assembled.failures,
        skipped_updates: assembled.skipped_updates,
    })
}
