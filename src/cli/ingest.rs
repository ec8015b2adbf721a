//! Ingest command implementation

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::PathBuf;

use super::utils::{open_store, trash_disposer};
use crate::domain::Config;
use crate::ingest::ingest_path;

#[derive(Args)]
pub struct IngestArgs {
    /// Snapshot file or directory (defaults to the configured watch directory)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,
}

pub fn run(args: IngestArgs, config: &Config) -> Result<()> {
    let path = args.path.unwrap_or_else(|| config.watch_dir_path());
    let mut store = open_store(config)?;
    let disposer = trash_disposer(config)?;

    let report = ingest_path(&mut store, &path, &disposer, config)
        .with_context(|| format!("Failed to ingest {}", path.display()))?;

    for file in &report.files {
        let disposal = if file.disposed { " (moved to trash)" } else { "" };
        println!(
            "{} {}: {} groups, {} tabs{}",
            style("Ingested").green().bold(),
            file.path.display(),
            file.counts.groups,
            file.counts.tabs,
            disposal
        );
    }
    for (skipped, reason) in &report.skipped {
        eprintln!("{} {}: {}", style("Skipped").yellow().bold(), skipped.display(), reason);
    }
    if report.files.is_empty() && report.skipped.is_empty() {
        println!("No snapshot files found in {}", path.display());
    }
    Ok(())
}
