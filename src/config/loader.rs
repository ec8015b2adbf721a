//! Config file loading

use crate::domain::Config;
use crate::utils::paths::config_root_dir;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Section name that may wrap the settings inside a shared config file.
const SECTION: &str = "thoth";

const CANDIDATES: [&str; 5] = ["thoth.toml", ".thoth.toml", "thoth.yml", ".thoth.yml", "thoth.yaml"];

/// Load configuration from `config_path`, or from the first file discovered in
/// `base_dir` and then the per-user config directory.
///
/// An explicitly named file that cannot be read or parsed is an error; an
/// auto-discovered one only logs a warning and yields the defaults.
pub fn load_config(base_dir: &Path, config_path: Option<&Path>) -> Result<Config> {
    let explicit = config_path.is_some();

    let discovered = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config(base_dir, config_root_dir().as_deref()),
    };

    let Some(config_file) = discovered else {
        return Ok(Config::default());
    };

    match read_config_file(&config_file) {
        Ok(cfg) => {
            tracing::debug!("loaded config from {}", config_file.display());
            Ok(cfg)
        }
        Err(e) if !explicit => {
            tracing::warn!("Ignoring auto-discovered config {}: {:#}", config_file.display(), e);
            Ok(Config::default())
        }
        Err(e) => Err(e),
    }
}

fn read_config_file(config_file: &Path) -> Result<Config> {
    let content = fs::read_to_string(config_file)
        .with_context(|| format!("Failed reading config file: {}", config_file.display()))?;

    let ext = config_file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "toml" => parse_toml_config(&content, config_file),
        "yaml" | "yml" => parse_yaml_config(&content, config_file),
        other => anyhow::bail!(
            "Unsupported config extension '.{}' for file {}",
            other,
            config_file.display()
        ),
    }
}

/// Parse TOML config, supporting a nested [thoth] section.
fn parse_toml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: toml::Value = toml::from_str(content)
        .with_context(|| format!("Invalid TOML syntax: {}", config_file.display()))?;

    let config_val = match raw.get(SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };

    config_val.try_into().with_context(|| format!("Invalid TOML config: {}", config_file.display()))
}

/// Parse YAML config, supporting a nested thoth section.
fn parse_yaml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: serde_yaml::Value = serde_yaml::from_str(content)
        .with_context(|| format!("Invalid YAML syntax: {}", config_file.display()))?;

    // An empty file parses as null.
    let config_val = match raw.get(SECTION) {
        Some(nested) => nested.clone(),
        None if raw.is_null() => return Ok(Config::default()),
        None => raw,
    };

    serde_yaml::from_value(config_val)
        .with_context(|| format!("Invalid YAML config: {}", config_file.display()))
}

fn discover_config(base_dir: &Path, user_config_dir: Option<&Path>) -> Option<PathBuf> {
    for candidate in CANDIDATES {
        let path = base_dir.join(candidate);
        if path.is_file() {
            return Some(path);
        }
    }

    user_config_dir.map(|dir| dir.join(SECTION).join("config.toml")).filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_file() {
        let tmp = TempDir::new().expect("tmp");
        assert!(discover_config(tmp.path(), None).is_none());
        let cfg = load_config(tmp.path(), Some(&tmp.path().join("none.toml")));
        assert!(cfg.is_err(), "explicit missing file must fail");
    }

    #[test]
    fn test_load_toml_config() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(
            tmp.path().join("thoth.toml"),
            "database = '/tmp/archive.sqlite'\ntest_mode = true\nmail_chunk_size = 25\n",
        )
        .expect("write");

        let cfg = load_config(tmp.path(), None).expect("config");
        assert_eq!(cfg.database, Some(PathBuf::from("/tmp/archive.sqlite")));
        assert!(cfg.test_mode);
        assert_eq!(cfg.mail_chunk_size, 25);
        assert_eq!(cfg.snapshot_glob, crate::domain::config::DEFAULT_SNAPSHOT_GLOB);
    }

    #[test]
    fn test_nested_toml_section() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("shared.toml");
        fs::write(&path, "[other]\nx = 1\n\n[thoth]\nbrowser = 'firefox'\n").expect("write");

        let cfg = load_config(tmp.path(), Some(&path)).expect("config");
        assert_eq!(cfg.browser, vec!["firefox"]);
    }

    #[test]
    fn test_yaml_config_and_nested_section() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join(".thoth.yml"), "thoth:\n  snapshot_glob: 'session*.json'\n")
            .expect("write");

        let cfg = load_config(tmp.path(), None).expect("config");
        assert_eq!(cfg.snapshot_glob, "session*.json");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("thoth.yaml");
        fs::write(&path, "").expect("write");
        let cfg = load_config(tmp.path(), Some(&path)).expect("config");
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_toml_preferred_over_yaml() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("thoth.toml"), "mail_chunk_size = 7\n").expect("write");
        fs::write(tmp.path().join("thoth.yml"), "mail_chunk_size: 9\n").expect("write");
        let cfg = load_config(tmp.path(), None).expect("config");
        assert_eq!(cfg.mail_chunk_size, 7);
    }

    #[test]
    fn test_user_config_dir_fallback() {
        let base = TempDir::new().expect("base");
        let user = TempDir::new().expect("user");
        fs::create_dir_all(user.path().join("thoth")).expect("mkdir");
        fs::write(user.path().join("thoth/config.toml"), "gmail_user = 'alice'\n").expect("write");

        let found = discover_config(base.path(), Some(user.path())).expect("discovered");
        assert!(found.ends_with("thoth/config.toml"));
    }

    #[test]
    fn test_explicit_config_invalid_type_returns_err() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "test_mode = \"sometimes\"\n").expect("write");

        let result = load_config(tmp.path(), Some(&path));
        assert!(result.is_err(), "explicit config with invalid type should return Err");
    }

    #[test]
    fn test_explicit_config_empty_browser_returns_err() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "browser = []\n").expect("write");

        assert!(load_config(tmp.path(), Some(&path)).is_err());
    }

    #[test]
    fn test_explicit_unsupported_extension_returns_err() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("thoth.ini");
        fs::write(&path, "test_mode=true\n").expect("write");

        assert!(load_config(tmp.path(), Some(&path)).is_err());
    }

    #[test]
    fn test_auto_discovered_invalid_type_returns_default() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("thoth.toml"), "mail_chunk_size = 'lots'\n").expect("write");

        let cfg = load_config(tmp.path(), None).expect("should not error on auto-discovery");
        assert_eq!(cfg.mail_chunk_size, Config::default().mail_chunk_size);
    }
}
