//! Command-line interface for thoth
//!
//! Subcommands for ingesting snapshots, archiving mail and reading the archive back.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{load_config, merge_cli_with_config, CliOverrides};
use crate::domain::Config;

mod ingest;
mod list;
mod mail;
mod open;
mod query;
mod search;
mod utils;
mod watch;

/// Archive browser tab snapshots and email into a searchable SQLite store
#[derive(Parser)]
#[command(name = "thoth")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Archive database file
    #[arg(long, global = true, env = "THOTH_DB", value_name = "FILE")]
    db: Option<PathBuf>,

    /// Path to config file (thoth.toml or .thoth.yml)
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Keep ingested snapshot files instead of moving them to the trash
    #[arg(long, global = true, env = "THOTH_TEST_MODE", value_parser = clap::builder::BoolishValueParser::new())]
    test_mode: bool,

    /// Browser command used by `open`, e.g. "firefox --private-window"
    #[arg(long, global = true, env = "THOTH_BROWSER", value_name = "CMD")]
    browser: Option<String>,

    /// Directory scanned by `ingest` and `watch` when no path is given
    #[arg(long, global = true, env = "THOTH_WATCH_DIR", value_name = "DIR")]
    watch_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a snapshot file, or every snapshot in a directory
    Ingest(ingest::IngestArgs),

    /// Archive mail from Gmail
    Mail(mail::MailArgs),

    /// Open (or print) the tabs of a group or tag set
    Open(open::OpenArgs),

    /// List archived groups
    List,

    /// List tags with the number of group versions carrying them
    Tags,

    /// Show every stored version of a group
    History(list::HistoryArgs),

    /// Full-text search over archived mail
    Search(search::SearchArgs),

    /// Run a read-only SQL statement against the archive
    Query(query::QueryArgs),

    /// Watch a directory and ingest snapshots as they appear
    Watch(watch::WatchArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Ingest(args) => ingest::run(args, &config),
        Commands::Mail(args) => mail::run(args, &config),
        Commands::Open(args) => open::run(args, &config),
        Commands::List => list::run_groups(&config),
        Commands::Tags => list::run_tags(&config),
        Commands::History(args) => list::run_history(args, &config),
        Commands::Search(args) => search::run(args, &config),
        Commands::Query(args) => query::run(args, &config),
        Commands::Watch(args) => watch::run(args, &config),
    }
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let base_dir = std::env::current_dir()?;
    let file_config = load_config(&base_dir, cli.config.as_deref())?;
    Ok(merge_cli_with_config(file_config, cli_overrides(cli)))
}

fn cli_overrides(cli: &Cli) -> CliOverrides {
    CliOverrides {
        database: cli.db.clone(),
        test_mode: if cli.test_mode { Some(true) } else { None },
        browser: cli
            .browser
            .as_deref()
            .map(|cmd| cmd.split_whitespace().map(str::to_string).collect()),
        watch_dir: cli.watch_dir.clone(),
        ..CliOverrides::default()
    }
}
