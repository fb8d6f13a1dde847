/// `load_config` module: loads the optional YAML config file and injects
/// environment overrides and secrets.
///
/// # Responsibilities
/// - Parse the user-supplied YAML file into [`CliConfig`]; every key is optional
/// - Inject `CHAT_EXPORT_ORIGIN` (overrides `origin`) and
///   `CHAT_EXPORT_SESSION_COOKIE` (never read from the file)
/// - Map the result onto the core [`ExportConfig`], applying CLI flag overrides
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
///
/// Accepted YAML:
///
/// ```yaml
/// origin: https://claude.ai
/// max_depth: 100
/// output_dir: ./exports
/// title: my chat
/// ```
use anyhow::Result;
use chat_export_core::config::{ExportConfig, DEFAULT_MAX_DEPTH, DEFAULT_ORIGIN};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const ORIGIN_ENV: &str = "CHAT_EXPORT_ORIGIN";
pub const SESSION_COOKIE_ENV: &str = "CHAT_EXPORT_SESSION_COOKIE";

/// Directory archives are written to when neither the file nor a flag names one.
pub const DEFAULT_OUTPUT_DIR: &str = ".";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub title: Option<String>,
    /// Cookie header for blob requests. Environment only.
    #[serde(skip)]
    pub session_cookie: Option<String>,
}

impl CliConfig {
    /// Core settings for one run. `title` from the command line wins over the file.
    pub fn export_config(&self, title: Option<String>) -> ExportConfig {
        ExportConfig {
            origin: self
                .origin
                .clone()
                .unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
            max_depth: self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
            title: title.or_else(|| self.title.clone()),
        }
    }

    /// `flag` if given, else the configured directory, else the working directory.
    pub fn output_dir(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }
}

/// Loads the YAML config at `path` (defaults when `None`) and injects
/// environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => {
            info!("No config file given, using defaults");
            CliConfig::default()
        }
    };

    if let Ok(origin) = std::env::var(ORIGIN_ENV) {
        if origin.trim().is_empty() {
            warn!(env = ORIGIN_ENV, "Ignoring empty origin override");
        } else {
            info!(env = ORIGIN_ENV, origin = %origin, "Origin overridden from environment");
            config.origin = Some(origin);
        }
    }

    config.session_cookie = std::env::var(SESSION_COOKIE_ENV)
        .ok()
        .filter(|cookie| !cookie.is_empty());
    info!(
        session_cookie = config.session_cookie.is_some(),
        "Session cookie loaded from environment"
    );

    Ok(config)
}

fn read_config_file(path_ref: &Path) -> Result<CliConfig> {
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty file is a valid, empty config.
    if config_content.trim().is_empty() {
        return Ok(CliConfig::default());
    }

    match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}
