//! Email upsert and full-text search.

use rusqlite::{params, OptionalExtension, Transaction};
use std::collections::HashSet;

use super::{format_timestamp, parse_timestamp, Store};
use crate::domain::Message;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertCounts {
    pub inserted: usize,
    pub updated: usize,
}

impl std::ops::AddAssign for UpsertCounts {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.updated += other.updated;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHit {
    pub message_id: String,
    pub sender: String,
    pub subject: String,
    pub date: Option<chrono::DateTime<chrono::Utc>>,
    pub snippet: String,
}

impl Store {
    /// Upsert `messages` by message id, `chunk_size` rows per transaction.
    ///
    /// A message counts as inserted when its id was absent before its own upsert;
    /// a repeated id later in the same batch therefore counts as an update, which
    /// keeps the totals independent of the chunk size.
    pub fn upsert_messages(
        &mut self,
        messages: &[Message],
        chunk_size: usize,
    ) -> Result<UpsertCounts> {
        let mut totals = UpsertCounts::default();
        for chunk in messages.chunks(chunk_size.max(1)) {
            let tx = self.conn.transaction()?;
            let counts = upsert_chunk(&tx, chunk)?;
            tx.commit()?;
            tracing::debug!(
                "email chunk committed: {} inserted, {} updated",
                counts.inserted,
                counts.updated
            );
            totals += counts;
        }
        Ok(totals)
    }

    pub fn message(&self, message_id: &str) -> Result<Option<Message>> {
        let row = self
            .conn
            .query_row(
                "
                SELECT message_id, sender, recipient_json, subject, body, date, labels_json
                FROM email WHERE message_id = ?1
                ",
                params![message_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((message_id, sender, recipients, subject, body, date, labels)) = row else {
            return Ok(None);
        };
        Ok(Some(Message {
            message_id,
            sender,
            recipients: serde_json::from_str(&recipients)?,
            subject,
            body,
            date: parse_timestamp(date),
            labels: serde_json::from_str(&labels)?,
        }))
    }

    /// Full-text search over subject, sender and body, optionally within one calendar year.
    pub fn search_messages(
        &self,
        text: &str,
        year: Option<i32>,
        limit: usize,
    ) -> Result<Vec<MessageHit>> {
        let fts_query = fts_terms(text);
        if fts_query.is_empty() {
            return Err(Error::InvalidRequest("search text is empty after tokenization".to_string()));
        }
        let (from, until) = match year {
            Some(y) => (Some(format!("{y:04}-01-01T00:00:00")), Some(format!("{:04}-01-01T00:00:00", y + 1))),
            None => (None, None),
        };

        let mut stmt = self.conn.prepare(
            "
            SELECT e.message_id, e.sender, e.subject, e.date,
                   snippet(email_fts, 2, '[', ']', '...', 12)
            FROM email_fts
            JOIN email e ON e.id = email_fts.rowid
            WHERE email_fts MATCH ?1
              AND (?2 IS NULL OR (e.date >= ?2 AND e.date < ?3))
            ORDER BY bm25(email_fts), e.date DESC
            LIMIT ?4
            ",
        )?;
        let rows = stmt.query_map(params![fts_query, from, until, limit.max(1) as i64], |row| {
            Ok(MessageHit {
                message_id: row.get(0)?,
                sender: row.get(1)?,
                subject: row.get(2)?,
                date: parse_timestamp(row.get(3)?),
                snippet: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn upsert_chunk(tx: &Transaction<'_>, chunk: &[Message]) -> Result<UpsertCounts> {
    let ids: Vec<&str> = chunk.iter().map(|m| m.message_id.as_str()).collect();
    let mut existing: HashSet<String> = {
        let mut stmt = tx.prepare(
            "SELECT message_id FROM email WHERE message_id IN (SELECT value FROM json_each(?1))",
        )?;
        let rows = stmt.query_map(params![serde_json::to_string(&ids)?], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    let mut upsert = tx.prepare_cached(
        "
        INSERT INTO email (message_id, sender, recipient_json, subject, body, date, labels_json)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(message_id) DO UPDATE SET
            sender = excluded.sender,
            recipient_json = excluded.recipient_json,
            subject = excluded.subject,
            body = excluded.body,
            date = excluded.date,
            labels_json = excluded.labels_json
        RETURNING id
        ",
    )?;
    let mut unindex = tx.prepare_cached("DELETE FROM email_fts WHERE rowid = ?1")?;
    let mut index = tx.prepare_cached(
        "INSERT INTO email_fts (rowid, subject, sender, body) VALUES (?1, ?2, ?3, ?4)",
    )?;

    let mut counts = UpsertCounts::default();
    for message in chunk {
        let id: i64 = upsert.query_row(
            params![
                message.message_id,
                message.sender,
                serde_json::to_string(&message.recipients)?,
                message.subject,
                message.body,
                message.date.map(format_timestamp),
                serde_json::to_string(&message.labels)?,
            ],
            |row| row.get(0),
        )?;
        unindex.execute(params![id])?;
        index.execute(params![id, message.subject, message.sender, message.body])?;

        if existing.insert(message.message_id.clone()) {
            counts.inserted += 1;
        } else {
            counts.updated += 1;
        }
    }
    Ok(counts)
}

/// Quote each word so user text is never read as FTS5 syntax.
fn fts_terms(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\""))
        .collect::<Vec<_>>()
        .join(" ")
}
