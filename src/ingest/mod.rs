//! Snapshot ingestion pipeline: parse, store, dispose.

use chrono::Utc;
use globset::Glob;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::domain::Config;
use crate::error::{Error, Result};
use crate::snapshot::parse_snapshot_file;
use crate::store::{IngestCounts, Store};

pub mod dispose;

pub use dispose::{Disposer, TrashDisposer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub counts: IngestCounts,
    pub disposed: bool,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub files: Vec<FileReport>,
    /// Files that could not be read or parsed, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Ingest one snapshot file.
///
/// Parsing happens before any write, so an unparseable file leaves the store
/// untouched. The file is disposed only after the batch commits, and never in
/// test mode.
pub fn ingest_file(
    store: &mut Store,
    path: &Path,
    disposer: &dyn Disposer,
    config: &Config,
) -> Result<FileReport> {
    let snapshot = parse_snapshot_file(path)?;
    let counts = store.ingest_snapshot(&snapshot, Some(Utc::now()))?;
    tracing::info!(
        "ingested {} ({} groups, {} tabs)",
        path.display(),
        counts.groups,
        counts.tabs
    );

    let disposed = if config.test_mode {
        tracing::debug!("test mode: leaving {} in place", path.display());
        false
    } else {
        match disposer.dispose(path) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("ingested {} but could not move it to the trash: {err}", path.display());
                false
            }
        }
    };

    Ok(FileReport { path: path.to_path_buf(), counts, disposed })
}

/// Ingest a file, or every matching snapshot in a directory.
///
/// In directory mode unreadable or unparseable files are reported and skipped;
/// a storage failure stops the run.
pub fn ingest_path(
    store: &mut Store,
    path: &Path,
    disposer: &dyn Disposer,
    config: &Config,
) -> Result<RunReport> {
    let mut report = RunReport::default();

    if path.is_file() {
        report.files.push(ingest_file(store, path, disposer, config)?);
        return Ok(report);
    }
    if !path.is_dir() {
        return Err(Error::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        ));
    }

    let files = collect_snapshot_files(path, &config.snapshot_glob)?;
    if files.is_empty() {
        tracing::info!("no files matching '{}' in {}", config.snapshot_glob, path.display());
    }
    for file in files {
        match ingest_file(store, &file, disposer, config) {
            Ok(file_report) => report.files.push(file_report),
            Err(err @ (Error::Parse { .. } | Error::Io { .. })) => {
                tracing::warn!("skipping {}: {err}", file.display());
                report.skipped.push((file, err.to_string()));
            }
            Err(err) => return Err(err),
        }
    }
    Ok(report)
}

/// Files directly inside `dir` whose names match `pattern`, sorted by name.
pub fn collect_snapshot_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = Glob::new(pattern)
        .map_err(|e| Error::InvalidRequest(format!("invalid snapshot glob '{pattern}': {e}")))?
        .compile_matcher();

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::io(dir, e.into()))?;
        if entry.file_type().is_file() && matcher.is_match(entry.file_name()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
