//! # contract: collaborator interfaces for an export run
//!
//! The pipeline talks to the outside world through three traits:
//!
//! - [`BlobFetcher`]: fetches one remote blob (image, document, attachment
//!   preview) by the reference found in the snapshot.
//! - [`StatusSink`]: receives coarse [`StatusEvent`]s for a presentation layer.
//! - [`DownloadSink`]: persists the finished archive under a suggested name.
//!
//! ## Mocking & Testing
//! - The traits are annotated for `mockall`, so tests get `MockBlobFetcher`,
//!   `MockStatusSink` and `MockDownloadSink` under the `test-export-mocks`
//!   feature.
//!
//! ## Implementations
//! - [`crate::fetch::HttpBlobFetcher`] is the real fetcher.
//! - The CLI crate provides a directory-backed download sink and a status
//!   sink that prints to the terminal.

use std::path::PathBuf;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure fetching a single blob. Never fatal for the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
}

/// Failure persisting the finished archive.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to save {file_name}: {source}")]
    Io {
        file_name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("download rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Progress,
    Success,
    Error,
}

/// Progress notification, serialised as `{"text": ..., "state": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub text: String,
    pub state: StatusState,
}

impl StatusEvent {
    pub fn progress(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            state: StatusState::Progress,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            state: StatusState::Success,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            state: StatusState::Error,
        }
    }
}

/// Source of remote blobs referenced by messages.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait BlobFetcher: Send + Sync {
    /// Fetch the blob behind `url`, which may be relative to the fetcher's origin.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Receiver of status events.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait StatusSink: Send + Sync {
    fn emit(&self, event: StatusEvent);
}

/// Destination for the finished archive.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Persist `payload` using `file_name` as the suggested name and return
    /// where it ended up.
    async fn save(&self, file_name: &str, payload: &[u8]) -> Result<PathBuf, SinkError>;
}
