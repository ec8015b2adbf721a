//! Error taxonomy shared by the library modules.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Snapshot content is neither structured data nor a usable URL list.
    #[error("failed to parse snapshot {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    /// Transaction or connection failure in the store.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A query matched nothing. Reported to the user, not treated as a failure.
    #[error("not found: {0}")]
    NotFound(String),

    /// The mail provider rejected our credentials.
    #[error("mail authentication failed: {0}")]
    Auth(String),

    #[error("mail provider error: {0}")]
    Mail(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl Error {
    pub fn parse(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse { source_name: source_name.into(), reason: reason.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
