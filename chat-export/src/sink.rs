//! Terminal-side collaborators: where finished archives go and how status
//! events are shown.

use std::path::PathBuf;

use async_trait::async_trait;
use chat_export_core::contract::{DownloadSink, SinkError, StatusEvent, StatusSink, StatusState};
use tracing::{error, info, warn};

/// Writes archives into a directory under their suggested name, or to an
/// explicit path when one was chosen.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    output_dir: PathBuf,
    save_as: Option<PathBuf>,
}

impl DirectorySink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            save_as: None,
        }
    }

    /// Save to `path` instead of `{output_dir}/{suggested name}`.
    pub fn save_as(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_as = Some(path.into());
        self
    }

    pub fn destination(&self, file_name: &str) -> PathBuf {
        match &self.save_as {
            Some(path) => path.clone(),
            None => self.output_dir.join(file_name),
        }
    }
}

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn save(&self, file_name: &str, payload: &[u8]) -> Result<PathBuf, SinkError> {
        let destination = self.destination(file_name);
        let io_error = |source| SinkError::Io {
            file_name: destination.display().to_string(),
            source,
        };

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                error!(error = ?e, dir = ?parent, "Failed to create output directory");
                io_error(e)
            })?;
        }

        tokio::fs::write(&destination, payload).await.map_err(|e| {
            error!(error = ?e, path = ?destination, "Failed to write archive");
            io_error(e)
        })?;
        info!(path = ?destination, size = payload.len(), "Archive written");
        Ok(destination)
    }
}

/// Prints status events to stdout and mirrors them into the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalStatus;

impl StatusSink for TerminalStatus {
    fn emit(&self, event: StatusEvent) {
        match event.state {
            StatusState::Progress => info!(status = "progress", "{}", event.text),
            StatusState::Success => info!(status = "success", "{}", event.text),
            StatusState::Error => warn!(status = "error", "{}", event.text),
        }
        println!("{}", event.text);
    }
}
