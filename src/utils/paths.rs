//! Per-user directory resolution.

use std::path::{Path, PathBuf};

pub fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("USERPROFILE").map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}

/// Replace a leading `~` with the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

pub fn data_root_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("LOCALAPPDATA").map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        if let Some(xdg) = non_empty_env("XDG_DATA_HOME") {
            return Some(PathBuf::from(xdg));
        }
        home_dir().map(|home| home.join(".local").join("share"))
    }
}

pub fn config_root_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        if let Some(xdg) = non_empty_env("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg));
        }
        home_dir().map(|home| home.join(".config"))
    }
}

pub fn default_database_path() -> PathBuf {
    data_root_dir()
        .map(|root| root.join("thoth").join("thoth.sqlite"))
        .unwrap_or_else(|| PathBuf::from(".thoth").join("thoth.sqlite"))
}

pub fn default_downloads_dir() -> PathBuf {
    home_dir().map(|home| home.join("Downloads")).unwrap_or_else(|| PathBuf::from("."))
}

/// Root of the user's trash: `~/.Trash` on macOS, the freedesktop trash elsewhere.
pub fn trash_root_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        home_dir().map(|home| home.join(".Trash"))
    }
    #[cfg(not(target_os = "macos"))]
    {
        data_root_dir().map(|root| root.join("Trash"))
    }
}

#[cfg(not(target_os = "windows"))]
fn non_empty_env(key: &str) -> Option<std::ffi::OsString> {
    std::env::var_os(key).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_tilde_leaves_plain_paths_alone() {
        let path = Path::new("/var/tmp/thoth.sqlite");
        assert_eq!(expand_tilde(path), path);
        assert_eq!(expand_tilde(Path::new("relative/file")), Path::new("relative/file"));
    }

    #[test]
    fn expand_tilde_uses_home() {
        if let Some(home) = home_dir() {
            assert_eq!(expand_tilde(Path::new("~/Downloads")), home.join("Downloads"));
        }
    }

    #[test]
    fn default_database_is_thoth_sqlite() {
        let db = default_database_path();
        assert_eq!(db.file_name().and_then(|n| n.to_str()), Some("thoth.sqlite"));
    }
}
