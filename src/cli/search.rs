//! Search command implementation

use anyhow::Result;
use clap::Args;
use console::style;

use super::utils::{format_local, open_store};
use crate::domain::Config;

#[derive(Args)]
pub struct SearchArgs {
    /// Words to look for in subject, sender and body
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Restrict to messages dated in this year
    #[arg(short = 'y', long, value_name = "YEAR")]
    pub year: Option<i32>,

    /// Maximum number of results
    #[arg(short = 'n', long, value_name = "N", default_value_t = 20)]
    pub limit: usize,
}

pub fn run(args: SearchArgs, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let hits = store.search_messages(&args.text, args.year, args.limit)?;
    if hits.is_empty() {
        println!("No messages found");
        return Ok(());
    }

    for hit in hits {
        println!(
            "{}  {}  {}",
            style(format_local(hit.date)).dim(),
            style(&hit.subject).bold(),
            hit.sender
        );
        println!("    {}", hit.snippet.replace('\n', " "));
    }
    Ok(())
}
