//! Watch a download directory and ingest snapshot exports as they appear.

use globset::{Glob, GlobMatcher};
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::SystemTime;

use crate::domain::Config;
use crate::error::{Error, Result};
use crate::ingest::{collect_snapshot_files, ingest_file, Disposer, FileReport};
use crate::store::Store;

/// Decides which paths to ingest and remembers what has been handled.
pub struct SnapshotWatch<'a> {
    store: &'a mut Store,
    disposer: &'a dyn Disposer,
    config: &'a Config,
    matcher: GlobMatcher,
    seen: HashMap<PathBuf, SystemTime>,
}

impl<'a> SnapshotWatch<'a> {
    pub fn new(store: &'a mut Store, disposer: &'a dyn Disposer, config: &'a Config) -> Result<Self> {
        let matcher = Glob::new(&config.snapshot_glob)
            .map_err(|e| {
                Error::InvalidRequest(format!("invalid snapshot glob '{}': {e}", config.snapshot_glob))
            })?
            .compile_matcher();
        Ok(Self { store, disposer, config, matcher, seen: HashMap::new() })
    }

    /// Ingest everything already sitting in `dir`.
    pub fn sweep(&mut self, dir: &Path) -> Result<Vec<FileReport>> {
        let mut reports = Vec::new();
        for path in collect_snapshot_files(dir, &self.config.snapshot_glob)? {
            if let Some(report) = self.handle(&path)? {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// Ingest `path` if it is a matching snapshot not yet processed at its
    /// current modification time. Parse failures are logged and skipped.
    pub fn handle(&mut self, path: &Path) -> Result<Option<FileReport>> {
        let matches = path.file_name().is_some_and(|name| self.matcher.is_match(name));
        if !matches || !path.is_file() {
            return Ok(None);
        }
        let modified = path
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|e| Error::io(path, e))?;
        if self.seen.get(path) == Some(&modified) {
            tracing::debug!("already ingested {}", path.display());
            return Ok(None);
        }

        let outcome = ingest_file(self.store, path, self.disposer, self.config);
        self.seen.insert(path.to_path_buf(), modified);
        match outcome {
            Ok(report) => Ok(Some(report)),
            Err(err @ (Error::Parse { .. } | Error::Io { .. })) => {
                tracing::warn!("skipping {}: {err}", path.display());
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

/// Sweep `dir`, then block ingesting new or modified snapshots until the
/// watcher channel closes. `on_ingest` is called for every ingested file.
pub fn watch_directory(
    store: &mut Store,
    dir: &Path,
    disposer: &dyn Disposer,
    config: &Config,
    mut on_ingest: impl FnMut(&FileReport),
) -> Result<()> {
    if !dir.is_dir() {
        return Err(Error::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "watch directory does not exist"),
        ));
    }

    let mut watch = SnapshotWatch::new(store, disposer, config)?;
    for report in watch.sweep(dir)? {
        on_ingest(&report);
    }

    let (tx, rx) = channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(tx, NotifyConfig::default())?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    tracing::info!("watching {} for '{}'", dir.display(), config.snapshot_glob);

    for event in rx {
        let event = match event {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!("watch error: {err}");
                continue;
            }
        };
        if !(event.kind.is_create() || event.kind.is_modify()) {
            continue;
        }
        for path in &event.paths {
            if let Some(report) = watch.handle(path)? {
                on_ingest(&report);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    struct CountingDisposer(Cell<usize>);

    impl Disposer for CountingDisposer {
        fn dispose(&self, _path: &Path) -> std::io::Result<()> {
            self.0.set(self.0.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn same_mtime_is_ingested_once() {
        let tmp = TempDir::new().expect("tmp");
        let file = tmp.path().join("tabs.json");
        fs::write(&file, r#"["https://a.test"]"#).expect("write");
        let mut store = Store::open_in_memory().expect("store");
        let disposer = CountingDisposer(Cell::new(0));
        let config = Config::default();

        let mut watch = SnapshotWatch::new(&mut store, &disposer, &config).expect("watch");
        assert!(watch.handle(&file).expect("first").is_some());
        assert!(watch.handle(&file).expect("second").is_none());
        assert_eq!(disposer.0.get(), 1);
    }

    #[test]
    fn non_matching_and_broken_files_are_ignored() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("notes.json"), r#"["https://a.test"]"#).expect("write");
        fs::write(tmp.path().join("tabs-broken.json"), "").expect("write");
        fs::write(tmp.path().join("tabs-good.json"), r#"["https://b.test"]"#).expect("write");
        let mut store = Store::open_in_memory().expect("store");
        let disposer = CountingDisposer(Cell::new(0));
        let config = Config::default();

        let mut watch = SnapshotWatch::new(&mut store, &disposer, &config).expect("watch");
        assert!(watch.handle(&tmp.path().join("notes.json")).expect("handle").is_none());
        let reports = watch.sweep(tmp.path()).expect("sweep");
        assert_eq!(reports.len(), 1);
        assert!(reports[0].path.ends_with("tabs-good.json"));
    }
}
