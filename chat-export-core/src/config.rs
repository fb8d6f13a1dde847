use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Origin every relative blob reference in a snapshot is resolved against.
pub const DEFAULT_ORIGIN: &str = "https://claude.ai";

/// Depth cap for the snapshot walk.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Settings for one export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub origin: String,
    pub max_depth: usize,
    /// Page title the archive file name is derived from.
    pub title: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            title: None,
        }
    }
}

impl ExportConfig {
    pub fn trace_loaded(&self) {
        info!(
            origin = %self.origin,
            max_depth = self.max_depth,
            title = self.title.as_deref().unwrap_or(""),
            "Loaded ExportConfig"
        );
        debug!(?self, "ExportConfig loaded (full debug)");
    }
}
