//! thoth: archive browser tab snapshots and email into SQLite.
//!
//! Snapshot exports are parsed, stored as versioned tab groups and resolved
//! back into URL lists by group name or tags. Mail is pulled from a provider
//! page by page and kept searchable.

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod mail;
pub mod open;
pub mod snapshot;
pub mod store;
pub mod utils;
pub mod watch;

pub use error::{Error, Result};
