//! Retrieval: group versions by name, tag containment, listings and ad-hoc queries.

use chrono::{DateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{params, Params, Statement};
use std::collections::HashSet;

use super::{parse_timestamp, Store};
use crate::error::{Error, Result};
use crate::snapshot::group_key_of;

/// What to open. Non-empty `tags` take precedence over `group_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveRequest {
    pub group_name: Option<String>,
    pub tags: Vec<String>,
    pub merge_versions: bool,
}

impl ResolveRequest {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self { group_name: Some(name.into()), ..Self::default() }
    }

    pub fn merged(name: impl Into<String>) -> Self {
        Self { group_name: Some(name.into()), merge_versions: true, ..Self::default() }
    }

    pub fn by_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { tags: tags.into_iter().map(Into::into).collect(), ..Self::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub name: String,
    pub versions: usize,
    pub latest_saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSummary {
    pub tag: String,
    pub versions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupVersion {
    pub id: i64,
    pub name: String,
    pub saved_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub fingerprint: String,
    pub tab_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Store {
    /// URLs to open for `request`, in display order.
    ///
    /// Returns `Error::NotFound` when nothing matches.
    pub fn resolve(&self, request: &ResolveRequest) -> Result<Vec<String>> {
        let tags: Vec<&str> =
            request.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect();
        if !tags.is_empty() {
            return self.urls_for_tags(&tags);
        }

        let name = request
            .group_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                Error::InvalidRequest("a group name or at least one tag is required".to_string())
            })?;

        let urls = if request.merge_versions {
            self.urls_for_all_versions(name)?
        } else {
            self.urls_for_latest_version(name)?
        };
        if urls.is_empty() {
            return Err(Error::NotFound(format!("no tabs found for group '{name}'")));
        }
        Ok(urls)
    }

    /// Most recent version wins; versions with a capture time beat those without,
    /// and insertion order breaks the remaining ties.
    fn urls_for_latest_version(&self, name: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "
            SELECT t.url
            FROM tab_group_tab m
            JOIN tab t ON t.id = m.tab_id
            WHERE m.group_id = (
                SELECT id FROM tab_group
                WHERE name_key = ?1
                ORDER BY saved_at DESC NULLS LAST, id DESC
                LIMIT 1
            )
            ORDER BY m.position
            ",
        )?;
        collect_urls(&mut stmt, params![group_key_of(name)])
    }

    /// Every version, oldest first; duplicates across versions are kept.
    fn urls_for_all_versions(&self, name: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "
            SELECT t.url
            FROM tab_group g
            JOIN tab_group_tab m ON m.group_id = g.id
            JOIN tab t ON t.id = m.tab_id
            WHERE g.name_key = ?1
            ORDER BY g.saved_at ASC NULLS FIRST, g.id ASC, m.position ASC
            ",
        )?;
        collect_urls(&mut stmt, params![group_key_of(name)])
    }

    /// Distinct URLs of every version whose tags contain all of `tags`.
    fn urls_for_tags(&self, tags: &[&str]) -> Result<Vec<String>> {
        let wanted = serde_json::to_string(tags)?;
        let mut stmt = self.conn.prepare(
            "
            SELECT t.url
            FROM tab_group g
            JOIN tab_group_tab m ON m.group_id = g.id
            JOIN tab t ON t.id = m.tab_id
            WHERE NOT EXISTS (
                SELECT 1 FROM json_each(?1) AS wanted
                WHERE wanted.value NOT IN (SELECT have.value FROM json_each(g.tags_json) AS have)
            )
            ORDER BY g.saved_at ASC NULLS FIRST, g.id ASC, m.position ASC
            ",
        )?;
        let mut seen = HashSet::new();
        let urls: Vec<String> = collect_urls(&mut stmt, params![wanted])?
            .into_iter()
            .filter(|url| seen.insert(url.clone()))
            .collect();
        if urls.is_empty() {
            return Err(Error::NotFound(format!("no tabs found for tags {}", tags.join(", "))));
        }
        Ok(urls)
    }

    pub fn list_groups(&self) -> Result<Vec<GroupSummary>> {
        let mut stmt = self.conn.prepare(
            "
            SELECT
                (SELECT latest.name FROM tab_group latest
                 WHERE latest.name_key = g.name_key
                 ORDER BY latest.saved_at DESC NULLS LAST, latest.id DESC
                 LIMIT 1),
                COUNT(*),
                MAX(g.saved_at)
            FROM tab_group g
            GROUP BY g.name_key
            ORDER BY g.name_key
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(GroupSummary {
                name: row.get(0)?,
                versions: row.get::<_, i64>(1)? as usize,
                latest_saved_at: parse_timestamp(row.get(2)?),
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn list_tags(&self) -> Result<Vec<TagSummary>> {
        let mut stmt = self.conn.prepare(
            "
            SELECT tag.value, COUNT(DISTINCT g.id) AS versions
            FROM tab_group g, json_each(g.tags_json) AS tag
            GROUP BY tag.value
            ORDER BY versions DESC, tag.value ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TagSummary { tag: row.get(0)?, versions: row.get::<_, i64>(1)? as usize })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Every stored version of `name`, newest first.
    pub fn group_history(&self, name: &str) -> Result<Vec<GroupVersion>> {
        let mut stmt = self.conn.prepare(
            "
            SELECT g.id, g.name, g.saved_at, g.tags_json, g.url_hash,
                   (SELECT COUNT(*) FROM tab_group_tab m WHERE m.group_id = g.id)
            FROM tab_group g
            WHERE g.name_key = ?1
            ORDER BY g.saved_at DESC NULLS LAST, g.id DESC
            ",
        )?;
        let rows = stmt.query_map(params![group_key_of(name)], |row| {
            Ok((
                GroupVersion {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    saved_at: parse_timestamp(row.get(2)?),
                    tags: Vec::new(),
                    fingerprint: row.get(4)?,
                    tab_count: row.get::<_, i64>(5)? as usize,
                },
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut versions = Vec::new();
        for row in rows {
            let (mut version, tags_json) = row?;
            version.tags = serde_json::from_str(&tags_json)?;
            versions.push(version);
        }
        if versions.is_empty() {
            return Err(Error::NotFound(format!("no versions stored for group '{}'", name.trim())));
        }
        Ok(versions)
    }

    /// Run a single read-only statement and render every value as text.
    pub fn run_query(&self, sql: &str) -> Result<QueryOutput> {
        let mut stmt = self.conn.prepare(sql)?;
        if !stmt.readonly() {
            return Err(Error::InvalidRequest("only read-only statements are allowed".to_string()));
        }
        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let width = columns.len();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut rendered = Vec::with_capacity(width);
            for idx in 0..width {
                rendered.push(render_value(row.get_ref(idx)?));
            }
            out.push(rendered);
        }
        Ok(QueryOutput { columns, rows: out })
    }
}

fn collect_urls<P: Params>(stmt: &mut Statement<'_>, params: P) -> Result<Vec<String>> {
    let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Blob(bytes) => format!("<blob {} bytes>", bytes.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::parse_snapshot;

    fn store_with(snapshots: &[&str]) -> Store {
        let mut store = Store::open_in_memory().expect("store");
        for content in snapshots {
            let snap = parse_snapshot(content, "t").expect("parse");
            store.ingest_snapshot(&snap, None).expect("ingest");
        }
        store
    }

    #[test]
    fn name_match_is_case_insensitive() {
        let store = store_with(&[
            r#"{"groups": ["Music"], "tabs": [{"url": "https://a.test", "group": "Music"}]}"#,
        ]);
        assert_eq!(
            store.resolve(&ResolveRequest::by_name("mUSIC")).expect("resolve"),
            vec!["https://a.test"]
        );
    }

    #[test]
    fn dated_version_beats_undated_one() {
        let store = store_with(&[
            r#"{"timestamp": "2024-01-01T00:00:00Z", "groups": ["g"], "tabs": [{"url": "https://dated.test", "group": "g"}]}"#,
            r#"{"groups": ["g"], "tabs": [{"url": "https://undated.test", "group": "g"}]}"#,
        ]);
        assert_eq!(
            store.resolve(&ResolveRequest::by_name("g")).expect("resolve"),
            vec!["https://dated.test"]
        );
        assert_eq!(
            store.resolve(&ResolveRequest::merged("g")).expect("resolve"),
            vec!["https://undated.test", "https://dated.test"]
        );
    }

    #[test]
    fn identical_timestamps_fall_back_to_insertion_order() {
        let store = store_with(&[
            r#"{"groups": ["g"], "tabs": [{"url": "https://first.test", "group": "g"}]}"#,
            r#"{"groups": ["g"], "tabs": [{"url": "https://second.test", "group": "g"}]}"#,
        ]);
        assert_eq!(
            store.resolve(&ResolveRequest::by_name("g")).expect("resolve"),
            vec!["https://second.test"]
        );
    }

    #[test]
    fn tags_take_precedence_over_name() {
        let store = store_with(&[
            r#"{"groups": [{"name": "a", "tags": ["x"]}, {"name": "b"}], "tabs": [
                {"url": "https://a.test", "group": "a"},
                {"url": "https://b.test", "group": "b"}
            ]}"#,
        ]);
        let request = ResolveRequest {
            group_name: Some("b".to_string()),
            tags: vec!["x".to_string()],
            merge_versions: false,
        };
        assert_eq!(store.resolve(&request).expect("resolve"), vec!["https://a.test"]);
    }

    #[test]
    fn tag_results_are_distinct() {
        let store = store_with(&[
            r#"{"groups": [{"name": "a", "tags": ["x"]}], "tabs": [{"url": "https://a.test", "group": "a"}]}"#,
            r#"{"groups": [{"name": "a", "tags": ["x"]}], "tabs": [{"url": "https://a.test", "group": "a"}, {"url": "https://b.test", "group": "a"}]}"#,
        ]);
        assert_eq!(
            store.resolve(&ResolveRequest::by_tags(["x"])).expect("resolve"),
            vec!["https://a.test", "https://b.test"]
        );
    }

    #[test]
    fn tag_with_quote_is_bound_not_interpolated() {
        let store = store_with(&[
            r#"{"groups": [{"name": "a", "tags": ["it's"]}], "tabs": [{"url": "https://a.test", "group": "a"}]}"#,
        ]);
        assert_eq!(
            store.resolve(&ResolveRequest::by_tags(["it's"])).expect("resolve"),
            vec!["https://a.test"]
        );
        let err = store.resolve(&ResolveRequest::by_tags(["') OR 1=1 --"])).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn empty_request_is_invalid() {
        let store = store_with(&[]);
        let err = store.resolve(&ResolveRequest::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn listings_and_history() {
        let store = store_with(&[
            r#"{"timestamp": "2024-01-01T00:00:00Z", "groups": [{"name": "read", "tags": ["later", "long"]}], "tabs": [{"url": "https://a.test", "group": "read"}]}"#,
            r#"{"timestamp": "2024-02-01T00:00:00Z", "groups": [{"name": "Read", "tags": ["later"]}, {"name": "work", "tags": ["job"]}], "tabs": [{"url": "https://b.test", "group": "Read"}, {"url": "https://c.test", "group": "Read"}]}"#,
        ]);

        let groups = store.list_groups().expect("groups");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "Read");
        assert_eq!(groups[0].versions, 2);
        assert_eq!(groups[1].name, "work");

        let tags = store.list_tags().expect("tags");
        assert_eq!(tags[0], TagSummary { tag: "later".to_string(), versions: 2 });
        assert_eq!(tags.len(), 3);

        let history = store.group_history("READ").expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].tab_count, 2);
        assert_eq!(history[1].tags, vec!["later", "long"]);
        assert_ne!(history[0].fingerprint, history[1].fingerprint);

        assert!(store.group_history("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn corrupt_tag_json_is_reported() {
        let store = store_with(&[
            r#"{"groups": [{"name": "g", "tags": ["a"]}], "tabs": [{"url": "https://a.test", "group": "g"}]}"#,
        ]);
        store.connection().execute("UPDATE tab_group SET tags_json = '[\"a\"'", []).expect("corrupt");

        let err = store.group_history("g").unwrap_err();
        assert!(matches!(err, Error::Json(_)), "unexpected error: {err}");
    }

    #[test]
    fn merged_versions_keep_repeated_urls() {
        let store = store_with(&[
            r#"{"timestamp": "2024-01-01T00:00:00Z", "groups": ["g"], "tabs": [{"url": "https://a.test", "group": "g"}, {"url": "https://b.test", "group": "g"}]}"#,
            r#"{"timestamp": "2024-02-01T00:00:00Z", "groups": ["g"], "tabs": [{"url": "https://a.test", "group": "g"}, {"url": "https://b.test", "group": "g"}]}"#,
        ]);
        assert_eq!(
            store.resolve(&ResolveRequest::merged("g")).expect("merged"),
            vec!["https://a.test", "https://b.test", "https://a.test", "https://b.test"]
        );
    }

    #[test]
    fn run_query_renders_rows_and_rejects_writes() {
        let store = store_with(&[r#"["https://a.test"]"#]);
        let out = store.run_query("SELECT id, url, favicon_url FROM tab").expect("query");
        assert_eq!(out.columns, vec!["id", "url", "favicon_url"]);
        assert_eq!(out.rows, vec![vec!["1".to_string(), "https://a.test".to_string(), "NULL".to_string()]]);

        let err = store.run_query("DELETE FROM tab").unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}
