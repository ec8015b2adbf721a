//! Mail archiving: page through the provider, fetch each message, upsert in chunks.

use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::Message;
use crate::error::{Error, Result};
use crate::store::{Store, UpsertCounts};

pub mod gmail;

pub use gmail::GmailClient;

/// One page of message references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePage {
    pub message_ids: Vec<String>,
    pub next_page_token: Option<String>,
}

pub trait MailClient {
    fn list_messages(&self, page_token: Option<&str>, since: Option<NaiveDate>)
        -> Result<MessagePage>;

    fn get_message(&self, message_id: &str) -> Result<Message>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailSummary {
    pub fetched: usize,
    pub skipped: usize,
    pub inserted: usize,
    pub updated: usize,
}

/// Archive every message since `since`, following pagination to the end.
///
/// Authentication failures abort the run. Any other failure to fetch a single
/// message is logged and that message skipped.
pub fn archive_mail(
    client: &dyn MailClient,
    store: &mut Store,
    since: Option<NaiveDate>,
    chunk_size: usize,
) -> Result<MailSummary> {
    let mut summary = MailSummary::default();
    let mut totals = UpsertCounts::default();
    let mut page_token: Option<String> = None;

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{spinner} {pos} messages {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    loop {
        let page = client.list_messages(page_token.as_deref(), since)?;
        tracing::debug!(
            "listed {} messages (next page: {})",
            page.message_ids.len(),
            page.next_page_token.is_some()
        );

        let mut messages = Vec::with_capacity(page.message_ids.len());
        for id in &page.message_ids {
            match client.get_message(id) {
                Ok(message) => messages.push(message),
                Err(err @ Error::Auth(_)) => {
                    progress.finish_and_clear();
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!("skipping message {id}: {err}");
                    summary.skipped += 1;
                }
            }
            progress.inc(1);
        }

        summary.fetched += messages.len();
        totals += store.upsert_messages(&messages, chunk_size)?;
        progress.set_message(format!("({} inserted, {} updated)", totals.inserted, totals.updated));

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }
    progress.finish_and_clear();

    summary.inserted = totals.inserted;
    summary.updated = totals.updated;
    Ok(summary)
}
