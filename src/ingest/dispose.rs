//! Disposal of snapshot files after a successful ingest.

use chrono::Local;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::utils::paths::trash_root_dir;

pub trait Disposer {
    fn dispose(&self, path: &Path) -> io::Result<()>;
}

/// Moves files into the user's trash.
///
/// On freedesktop systems the file lands in `<root>/files` with a matching
/// `<root>/info/<name>.trashinfo` record so file managers can restore it.
#[derive(Debug, Clone)]
pub struct TrashDisposer {
    root: PathBuf,
    write_info: bool,
}

impl TrashDisposer {
    pub fn new(root: PathBuf, write_info: bool) -> Self {
        Self { root, write_info }
    }

    pub fn for_user() -> Option<Self> {
        trash_root_dir().map(|root| Self::new(root, !cfg!(target_os = "macos")))
    }

    fn files_dir(&self) -> PathBuf {
        if self.write_info {
            self.root.join("files")
        } else {
            self.root.clone()
        }
    }
}

impl Disposer for TrashDisposer {
    fn dispose(&self, path: &Path) -> io::Result<()> {
        let absolute = path.canonicalize()?;
        let file_name = absolute
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "file name is not UTF-8"))?
            .to_string();

        let files_dir = self.files_dir();
        fs::create_dir_all(&files_dir)?;
        let target_name = unique_name(&files_dir, &file_name);

        if self.write_info {
            let info_dir = self.root.join("info");
            fs::create_dir_all(&info_dir)?;
            let info = format!(
                "[Trash Info]\nPath={}\nDeletionDate={}\n",
                percent_encode_path(&absolute.to_string_lossy()),
                Local::now().format("%Y-%m-%dT%H:%M:%S")
            );
            fs::write(info_dir.join(format!("{target_name}.trashinfo")), info)?;
        }

        let target = files_dir.join(&target_name);
        if fs::rename(&absolute, &target).is_err() {
            // Different filesystem: copy then remove.
            fs::copy(&absolute, &target)?;
            fs::remove_file(&absolute)?;
        }
        tracing::debug!("moved {} to {}", absolute.display(), target.display());
        Ok(())
    }
}

fn unique_name(dir: &Path, file_name: &str) -> String {
    if !dir.join(file_name).exists() {
        return file_name.to_string();
    }
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    };
    (1..)
        .map(|n| match ext {
            Some(ext) => format!("{stem}.{n}.{ext}"),
            None => format!("{stem}.{n}"),
        })
        .find(|candidate| !dir.join(candidate).exists())
        .unwrap_or_else(|| file_name.to_string())
}

fn percent_encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
