//! Listing commands: groups, tags and per-group history

use anyhow::Result;
use clap::Args;
use console::style;

use super::utils::{format_local, open_store};
use crate::domain::Config;
use crate::error::Error;

#[derive(Args)]
pub struct HistoryArgs {
    /// Group name (case-insensitive)
    #[arg(value_name = "NAME")]
    pub name: String,
}

pub fn run_groups(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let groups = store.list_groups()?;
    if groups.is_empty() {
        println!("No groups archived yet");
        return Ok(());
    }

    println!("{}", style(format!("{:<32} {:>8}  {}", "GROUP", "VERSIONS", "LATEST")).bold());
    for group in groups {
        println!(
            "{:<32} {:>8}  {}",
            group.name,
            group.versions,
            format_local(group.latest_saved_at)
        );
    }
    Ok(())
}

pub fn run_tags(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let tags = store.list_tags()?;
    if tags.is_empty() {
        println!("No tags archived yet");
        return Ok(());
    }
    for tag in tags {
        println!("{} ({})", tag.tag, tag.versions);
    }
    Ok(())
}

pub fn run_history(args: HistoryArgs, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let versions = match store.group_history(&args.name) {
        Ok(versions) => versions,
        Err(Error::NotFound(_)) => {
            println!("No tabs found for group '{}'", args.name);
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if let Some(first) = versions.first() {
        println!("{}", style(&first.name).bold());
    }
    for version in versions {
        let tags =
            if version.tags.is_empty() { String::new() } else { format!(" [{}]", version.tags.join(", ")) };
        println!(
            "  #{:<6} {}  {:>4} tabs  {}{}",
            version.id,
            format_local(version.saved_at),
            version.tab_count,
            &version.fingerprint[..version.fingerprint.len().min(12)],
            tags
        );
    }
    Ok(())
}
