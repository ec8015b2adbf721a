//! The archive database.
//!
//! A `Store` owns one SQLite connection for the lifetime of a command. The
//! connection is closed when the store is dropped, on success and error paths
//! alike, and every write batch runs inside a `rusqlite::Transaction` that rolls
//! back unless it is explicitly committed.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

pub mod mail;
pub mod resolve;
pub mod schema;
pub mod tabs;

pub use mail::{MessageHit, UpsertCounts};
pub use resolve::{GroupSummary, GroupVersion, QueryOutput, ResolveRequest, TagSummary};
pub use tabs::IngestCounts;

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        schema::ensure_schema(&conn)?;
        tracing::debug!("opened archive at {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Raw connection, for ad-hoc inspection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Fixed-width RFC 3339 so that text order equals time order.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|dt| dt.with_timezone(&Utc))
}
