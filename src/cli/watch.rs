//! Watch command implementation

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::PathBuf;

use super::utils::{open_store, trash_disposer};
use crate::domain::Config;
use crate::watch::watch_directory;

#[derive(Args)]
pub struct WatchArgs {
    /// Directory to watch (defaults to the configured watch directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

pub fn run(args: WatchArgs, config: &Config) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| config.watch_dir_path());
    let mut store = open_store(config)?;
    let disposer = trash_disposer(config)?;

    eprintln!("Watching {} for '{}' (Ctrl-C to stop)", dir.display(), config.snapshot_glob);
    watch_directory(&mut store, &dir, &disposer, config, |report| {
        println!(
            "{} {}: {} groups, {} tabs",
            style("Ingested").green().bold(),
            report.path.display(),
            report.counts.groups,
            report.counts.tabs
        );
    })
    .with_context(|| format!("Watching {} failed", dir.display()))
}
