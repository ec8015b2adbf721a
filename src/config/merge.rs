//! Apply command-line overrides on top of file configuration.

use std::path::PathBuf;

use crate::domain::Config;

/// Values given on the command line (or through their environment variables).
/// `None` leaves the file value in place.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database: Option<PathBuf>,
    pub test_mode: Option<bool>,
    pub browser: Option<Vec<String>>,
    pub watch_dir: Option<PathBuf>,
    pub gmail_token: Option<String>,
}

pub fn merge_cli_with_config(mut config: Config, cli: CliOverrides) -> Config {
    if let Some(database) = cli.database {
        config.database = Some(database);
    }
    if let Some(test_mode) = cli.test_mode {
        config.test_mode = test_mode;
    }
    if let Some(browser) = cli.browser.filter(|b| !b.is_empty()) {
        config.browser = browser;
    }
    if let Some(dir) = cli.watch_dir {
        config.watch_dir = Some(dir);
    }
    if let Some(token) = cli.gmail_token.filter(|t| !t.trim().is_empty()) {
        config.gmail_token = Some(token);
    }
    config
}
