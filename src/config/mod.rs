//! Configuration loading and merging
//!
//! Settings come from an optional config file and are then overridden by
//! environment variables and CLI flags (CLI > Env > File > Defaults).

pub mod loader;
pub mod merge;

pub use loader::load_config;
pub use merge::{merge_cli_with_config, CliOverrides};
