///
/// This module implements the CLI interface for chat-export: command parsing,
/// argument handling and the async entrypoint used by `main` and the tests.
///
/// All pipeline logic (discovery, rendering, archive assembly) lives in the
/// [`chat-export-core`] crate. This module only loads inputs, wires up the
/// collaborators and reports results.
///
/// ## Features
/// - Entry struct [`Cli`] with the `export` and `list` subcommands.
/// - Async entrypoint [`run`] for programmatic invocation and integration testing.
/// - A `trace_initialised` event at start and an `exit` span at the end of every run.
///
/// [`chat-export-core`]: ../../chat-export-core/
use crate::load_config::{load_config, CliConfig};
use crate::sink::{DirectorySink, TerminalStatus};
use anyhow::{Context, Result};
use chat_export_core::export::export;
use chat_export_core::fetch::HttpBlobFetcher;
use chat_export_core::message::Message;
use chat_export_core::normalize::discover_messages;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Characters of message text shown by `list`.
const PREVIEW_CHARS: usize = 60;

/// CLI for chat-export: turn a saved page snapshot into a chat archive.
#[derive(Parser)]
#[clap(
    name = "chat-export",
    version,
    about = "Export chat transcripts from page snapshots as JSON, HTML, Markdown and a ZIP bundle"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the archive for a snapshot and save it
    Export {
        /// Path to the JSON page snapshot
        #[clap(long)]
        snapshot: PathBuf,
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// Page title the archive name is derived from
        #[clap(long)]
        title: Option<String>,
        /// Directory the archive is written to
        #[clap(long)]
        output_dir: Option<PathBuf>,
        /// Exact path to write the archive to, overriding the suggested name
        #[clap(long)]
        save_as: Option<PathBuf>,
    },
    /// Print the messages found in a snapshot
    List {
        /// Path to the JSON page snapshot
        #[clap(long)]
        snapshot: PathBuf,
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let (command, result) = match cli.command {
        Commands::Export {
            snapshot,
            config,
            title,
            output_dir,
            save_as,
        } => (
            "export",
            run_export(&snapshot, config.as_deref(), title, output_dir, save_as).await,
        ),
        Commands::List { snapshot, config } => {
            ("list", run_list(&snapshot, config.as_deref()).await)
        }
    };

    let span = tracing::info_span!("exit", command, success = result.is_ok());
    let _entered = span.enter();
    match &result {
        Ok(()) => tracing::info!(command, "exit"),
        Err(e) => tracing::error!(command, error = %e, "exit"),
    }
    result
}

async fn run_export(
    snapshot: &Path,
    config: Option<&Path>,
    title: Option<String>,
    output_dir: Option<PathBuf>,
    save_as: Option<PathBuf>,
) -> Result<()> {
    let cli_config = load_config(config)?;
    let export_config = cli_config.export_config(title);
    let root = read_snapshot(snapshot).await?;
    tracing::info!(command = "export", snapshot = ?snapshot, "Starting export");

    let fetcher = fetcher(&cli_config, &export_config.origin);
    let mut sink = DirectorySink::new(cli_config.output_dir(output_dir));
    if let Some(path) = save_as {
        sink = sink.save_as(path);
    }

    match export(&export_config, &root, &fetcher, &TerminalStatus, &sink).await {
        Ok(report) => {
            tracing::info!(command = "export", ?report, "Export complete");
            println!("Saved {}", report.saved_to.display());
            for failure in &report.failures {
                println!("  failed: {} ({})", failure.path, failure.reason);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "export", error = %e, "Export failed");
            Err(anyhow::Error::new(e).context("Export failed"))
        }
    }
}

async fn run_list(snapshot: &Path, config: Option<&Path>) -> Result<()> {
    let cli_config = load_config(config)?;
    let export_config = cli_config.export_config(None);
    let root = read_snapshot(snapshot).await?;

    let messages = discover_messages(&root, export_config.max_depth);
    tracing::info!(command = "list", count = messages.len(), "Listing messages");
    for (index, message) in messages.iter().enumerate() {
        println!("{}", list_line(index, message));
    }
    println!("{} messages", messages.len());
    Ok(())
}

fn fetcher(config: &CliConfig, origin: &str) -> HttpBlobFetcher {
    let fetcher = HttpBlobFetcher::new(origin);
    match &config.session_cookie {
        Some(cookie) => fetcher.with_session_cookie(cookie.clone()),
        None => fetcher,
    }
}

async fn read_snapshot(path: &Path) -> Result<Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read snapshot {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Snapshot {:?} is not valid JSON", path))
}

/// `{index}. [{sender}] {time} {preview} (attachments: n, files: n)`
pub fn list_line(index: usize, message: &Message) -> String {
    let text = message.text.as_deref().unwrap_or_default();
    let mut preview: String = text
        .chars()
        .take(PREVIEW_CHARS)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if text.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    format!(
        "{}. [{}] {} {} (attachments: {}, files: {})",
        index + 1,
        message.sender.as_str(),
        message.created_at.format("%Y-%m-%d %H:%M:%S"),
        preview,
        message.attachments.len(),
        message.all_files().count()
    )
}
