//! Snapshot upsert: tabs keyed by URL, one new group version per ingestion.

use chrono::{DateTime, Utc};
use rusqlite::params;
use std::collections::HashMap;

use super::{format_timestamp, Store};
use crate::error::Result;
use crate::snapshot::{group_key_of, Snapshot};
use crate::utils::content_fingerprint;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestCounts {
    pub groups: usize,
    pub tabs: usize,
    pub memberships: usize,
}

impl Store {
    /// Persist one snapshot atomically.
    ///
    /// Every group becomes a new version row; earlier versions with the same name
    /// are never touched. Tabs are upserted by URL. A repeated `(tab, group)` pair
    /// is ignored. `fallback_captured_at` stamps the versions when the snapshot
    /// carries no capture time of its own.
    pub fn ingest_snapshot(
        &mut self,
        snapshot: &Snapshot,
        fallback_captured_at: Option<DateTime<Utc>>,
    ) -> Result<IngestCounts> {
        let saved_at = snapshot.captured_at().or(fallback_captured_at).map(format_timestamp);
        let mut counts = IngestCounts::default();
        let mut group_ids: HashMap<String, i64> = HashMap::new();

        let tx = self.conn.transaction()?;
        {
            let mut insert_group = tx.prepare_cached(
                "
                INSERT INTO tab_group (name, name_key, tags_json, url_hash, saved_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                RETURNING id
                ",
            )?;
            for group in snapshot.groups() {
                let key = group_key_of(&group.name);
                if group_ids.contains_key(&key) {
                    continue;
                }
                let fingerprint = content_fingerprint(snapshot.member_urls(&key));
                let tags = serde_json::to_string(&group.tags)?;
                let id: i64 = insert_group.query_row(
                    params![group.name, key, tags, fingerprint, saved_at],
                    |row| row.get(0),
                )?;
                group_ids.insert(key, id);
                counts.groups += 1;
            }

            let mut upsert_tab = tx.prepare_cached(
                "
                INSERT INTO tab (title, url, favicon_url)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(url) DO UPDATE SET
                    title = excluded.title,
                    favicon_url = COALESCE(excluded.favicon_url, tab.favicon_url)
                RETURNING id
                ",
            )?;
            let mut link = tx.prepare_cached(
                "
                INSERT INTO tab_group_tab (tab_id, group_id, position)
                VALUES (?1, ?2, ?3)
                ON CONFLICT DO NOTHING
                ",
            )?;
            for tab in snapshot.tabs() {
                let tab_id: i64 = upsert_tab
                    .query_row(params![tab.title, tab.url, tab.favicon_url], |row| row.get(0))?;
                counts.tabs += 1;

                let Some(membership) = &tab.membership else {
                    continue;
                };
                match group_ids.get(&group_key_of(&membership.group)) {
                    Some(&group_id) => {
                        counts.memberships +=
                            link.execute(params![tab_id, group_id, membership.position])?;
                    }
                    None => tracing::debug!(
                        "tab {} names undeclared group '{}'; stored without membership",
                        tab.url,
                        membership.group
                    ),
                }
            }
        }
        tx.commit()?;

        tracing::debug!(
            "ingested {} groups, {} tabs, {} memberships",
            counts.groups,
            counts.tabs,
            counts.memberships
        );
        Ok(counts)
    }
}
