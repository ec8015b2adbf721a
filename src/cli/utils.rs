//! Shared CLI utilities.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};

use crate::domain::Config;
use crate::ingest::TrashDisposer;
use crate::store::Store;

/// Parse a comma-separated string into a `Vec<String>`, trimming whitespace and
/// discarding empty segments.  Returns `None` when `value` is `None`.
pub fn parse_csv(value: &Option<String>) -> Option<Vec<String>> {
    value.as_ref().map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
    })
}

pub fn open_store(config: &Config) -> Result<Store> {
    let path = config.database_path();
    Store::open(&path).with_context(|| format!("Failed to open archive {}", path.display()))
}

/// The user's trash. Without a home directory only test mode can proceed,
/// since nothing is disposed there.
pub fn trash_disposer(config: &Config) -> Result<TrashDisposer> {
    match TrashDisposer::for_user() {
        Some(trash) => Ok(trash),
        None if config.test_mode => Ok(TrashDisposer::new(std::env::temp_dir(), false)),
        None => anyhow::bail!("Cannot locate the trash directory (is HOME set?)"),
    }
}

pub fn format_local(timestamp: Option<DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        None => "-".to_string(),
    }
}
