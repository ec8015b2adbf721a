//! Mail command implementation

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use console::style;

use super::utils::open_store;
use crate::config::{merge_cli_with_config, CliOverrides};
use crate::domain::Config;
use crate::mail::{archive_mail, GmailClient};

#[derive(Args)]
pub struct MailArgs {
    /// Only archive messages received after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", conflicts_with = "days")]
    pub since: Option<NaiveDate>,

    /// Only archive messages from the last N days
    #[arg(long, value_name = "N")]
    pub days: Option<u32>,

    /// OAuth access token for the Gmail API
    #[arg(long, env = "THOTH_GMAIL_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub token: Option<String>,
}

pub fn run(args: MailArgs, config: &Config) -> Result<()> {
    let config = merge_cli_with_config(
        config.clone(),
        CliOverrides { gmail_token: args.token.clone(), ..CliOverrides::default() },
    );
    let since = since_date(&args, Local::now().date_naive());

    let client = GmailClient::new(&config.gmail_user, config.gmail_token.as_deref())?;
    let mut store = open_store(&config)?;
    let summary = archive_mail(&client, &mut store, since, config.mail_chunk_size())
        .context("Mail archiving failed")?;

    println!(
        "{} {} messages: {} new, {} updated",
        style("Archived").green().bold(),
        summary.fetched,
        summary.inserted,
        summary.updated
    );
    if summary.skipped > 0 {
        eprintln!("{} {} messages could not be fetched", style("Skipped").yellow().bold(), summary.skipped);
    }
    Ok(())
}

fn since_date(args: &MailArgs, today: NaiveDate) -> Option<NaiveDate> {
    args.since.or_else(|| args.days.map(|days| today - Duration::days(i64::from(days))))
}
