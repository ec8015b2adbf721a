//! Runtime configuration.
//!
//! A `Config` is built once per invocation (file, then environment, then CLI flags)
//! and handed by reference to every operation that needs it.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use crate::utils::paths::{default_database_path, default_downloads_dir, expand_tilde};

pub const DEFAULT_SNAPSHOT_GLOB: &str = "tabs*.json";
pub const DEFAULT_MAIL_CHUNK_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file. `None` resolves to the per-user data directory.
    pub database: Option<PathBuf>,

    /// Leave ingested snapshot files in place instead of moving them to the trash.
    pub test_mode: bool,

    /// Browser command; the URLs are appended after `--new-window`.
    #[serde(deserialize_with = "deserialize_command")]
    pub browser: Vec<String>,

    /// Directory scanned by `ingest` without a path and by `watch`.
    pub watch_dir: Option<PathBuf>,

    /// File-name glob selecting snapshot exports inside a directory.
    pub snapshot_glob: String,

    pub mail_chunk_size: usize,

    pub gmail_user: String,

    pub gmail_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            test_mode: false,
            browser: default_browser_command(),
            watch_dir: None,
            snapshot_glob: DEFAULT_SNAPSHOT_GLOB.to_string(),
            mail_chunk_size: DEFAULT_MAIL_CHUNK_SIZE,
            gmail_user: "me".to_string(),
            gmail_token: None,
        }
    }
}

impl Config {
    pub fn database_path(&self) -> PathBuf {
        match &self.database {
            Some(path) => expand_tilde(path),
            None => default_database_path(),
        }
    }

    pub fn watch_dir_path(&self) -> PathBuf {
        match &self.watch_dir {
            Some(path) => expand_tilde(path),
            None => default_downloads_dir(),
        }
    }

    pub fn mail_chunk_size(&self) -> usize {
        self.mail_chunk_size.max(1)
    }
}

#[cfg(target_os = "macos")]
fn default_browser_command() -> Vec<String> {
    ["open", "-na", "Google Chrome", "--args"].iter().map(|s| s.to_string()).collect()
}

#[cfg(not(target_os = "macos"))]
fn default_browser_command() -> Vec<String> {
    vec!["google-chrome".to_string()]
}

/// Accept `browser = "firefox"` as well as `browser = ["open", "-a", "Firefox", "--args"]`.
fn deserialize_command<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Command {
        Single(String),
        Parts(Vec<String>),
    }

    let parts = match Command::deserialize(deserializer)? {
        Command::Single(s) => s.split_whitespace().map(str::to_string).collect::<Vec<_>>(),
        Command::Parts(parts) => {
            parts.into_iter().filter(|p| !p.trim().is_empty()).collect::<Vec<_>>()
        }
    };
    if parts.is_empty() {
        return Err(serde::de::Error::custom("browser command must not be empty"));
    }
    Ok(parts)
}
