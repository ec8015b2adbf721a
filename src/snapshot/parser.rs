//! Snapshot parsing: structured JSON export, JSON URL list, or plain text.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

use super::{
    group_key_of, GroupSpec, Membership, Snapshot, SnapshotTab, StructuredSnapshot,
    UrlListSnapshot,
};
use crate::error::{Error, Result};
use crate::utils::read_file_safe;

const TIMESTAMP_FIELDS: [&str; 5] = ["timestamp", "savedAt", "saved_at", "capturedAt", "captured_at"];
const FAVICON_FIELDS: [&str; 3] = ["favIconUrl", "favicon", "favicon_url"];

/// Epoch values at or above this are milliseconds (year 5138 in seconds).
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

pub fn parse_snapshot_file(path: &Path) -> Result<Snapshot> {
    let content = read_file_safe(path)?;
    parse_snapshot(&content, &path.display().to_string())
}

/// Parse export content. `source` names the input in error messages.
pub fn parse_snapshot(content: &str, source: &str) -> Result<Snapshot> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => Ok(Snapshot::Structured(parse_structured(&map))),
        Ok(Value::Array(items)) => Ok(Snapshot::UrlList(parse_url_array(&items))),
        Ok(_) | Err(_) => parse_plain_text(content, source),
    }
}

fn parse_structured(map: &Map<String, Value>) -> StructuredSnapshot {
    let groups = parse_groups(map.get("groups"));

    let mut positions: HashMap<String, u32> = HashMap::new();
    let tabs = map
        .get("tabs")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|item| parse_tab(item, &mut positions)).collect())
        .unwrap_or_default();

    let captured_at =
        TIMESTAMP_FIELDS.iter().find_map(|field| map.get(*field)).and_then(parse_timestamp);

    StructuredSnapshot { groups, tabs, captured_at }
}

/// Groups whose names fold to the same key collapse into one, tags unioned.
fn parse_groups(value: Option<&Value>) -> Vec<GroupSpec> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut groups: Vec<GroupSpec> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();
    for item in items {
        let (name, tags) = match item {
            Value::String(name) => (name.trim(), Vec::new()),
            Value::Object(obj) => {
                let Some(name) = obj.get("name").and_then(Value::as_str) else {
                    continue;
                };
                (name.trim(), parse_tags(obj.get("tags")))
            }
            _ => continue,
        };
        if name.is_empty() {
            continue;
        }

        let key = group_key_of(name);
        match index_by_key.get(&key) {
            Some(&idx) => {
                let existing = &mut groups[idx];
                for tag in tags {
                    if !existing.tags.contains(&tag) {
                        existing.tags.push(tag);
                    }
                }
            }
            None => {
                index_by_key.insert(key, groups.len());
                groups.push(GroupSpec { name: name.to_string(), tags });
            }
        }
    }
    groups
}

fn parse_tags(value: Option<&Value>) -> Vec<String> {
    let raw: Vec<&str> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(csv)) => csv.split(',').collect(),
        _ => Vec::new(),
    };

    let mut tags: Vec<String> = Vec::new();
    for tag in raw.into_iter().map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

fn parse_tab(item: &Value, positions: &mut HashMap<String, u32>) -> Option<SnapshotTab> {
    let obj = item.as_object()?;
    let mut tab = tab_from_object(obj)?;

    let group = match obj.get("group") {
        Some(Value::String(name)) => Some(name.trim()),
        Some(Value::Object(group)) => group.get("name").and_then(Value::as_str).map(str::trim),
        _ => None,
    };
    if let Some(group) = group.filter(|g| !g.is_empty()) {
        let counter = positions.entry(group_key_of(group)).or_insert(0);
        tab.membership = Some(Membership { group: group.to_string(), position: *counter });
        *counter += 1;
    }
    Some(tab)
}

fn tab_from_object(obj: &Map<String, Value>) -> Option<SnapshotTab> {
    let url = non_empty_str(obj.get("url"))?;
    let title = non_empty_str(obj.get("title")).unwrap_or(url);
    let favicon_url = FAVICON_FIELDS.iter().find_map(|field| non_empty_str(obj.get(*field)));
    Some(SnapshotTab {
        title: title.to_string(),
        url: url.to_string(),
        favicon_url: favicon_url.map(str::to_string),
        membership: None,
    })
}

fn parse_url_array(items: &[Value]) -> UrlListSnapshot {
    let tabs = items
        .iter()
        .filter_map(|item| match item {
            Value::String(url) => {
                let url = url.trim();
                (!url.is_empty()).then(|| SnapshotTab::bare(url))
            }
            Value::Object(obj) => tab_from_object(obj),
            _ => None,
        })
        .collect();
    UrlListSnapshot { tabs }
}

fn parse_plain_text(content: &str, source: &str) -> Result<Snapshot> {
    let tabs: Vec<SnapshotTab> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(SnapshotTab::bare)
        .collect();

    if tabs.is_empty() {
        return Err(Error::parse(source, "neither a JSON export nor a list of URL lines"));
    }
    Ok(Snapshot::UrlList(UrlListSnapshot { tabs }))
}

/// Capture times outside years 0..=9999 are dropped: they cannot be stored in
/// fixed-width RFC 3339 and usually come from a misread epoch unit.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Number(n) => {
            let raw = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            from_epoch(raw)
        }
        _ => None,
    };
    parsed.filter(|ts| (0..=9999).contains(&ts.year()))
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    s.parse::<i64>().ok().and_then(from_epoch)
}

fn from_epoch(raw: i64) -> Option<DateTime<Utc>> {
    if raw.abs() >= MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(raw)
    } else {
        DateTime::from_timestamp(raw, 0)
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn structured(snapshot: Snapshot) -> StructuredSnapshot {
        match snapshot {
            Snapshot::Structured(s) => s,
            other => panic!("expected structured snapshot, got {other:?}"),
        }
    }

    #[test]
    fn parses_structured_export_with_groups() {
        let content = r#"{
            "timestamp": "2024-11-02T09:30:00Z",
            "groups": [{"name": "music", "tags": ["fun", "audio"]}, {"name": "work"}],
            "tabs": [
                {"id": 11, "title": "Bandcamp", "url": "https://bandcamp.com", "favIconUrl": "https://bandcamp.com/fav.ico", "group": "music"},
                {"id": 12, "title": "Tracker", "url": "https://tracker.test", "group": "work"},
                {"id": 13, "url": "https://radio.test", "group": "Music"},
                {"id": 14, "title": "loose", "url": "https://loose.test"}
            ]
        }"#;

        let snap = structured(parse_snapshot(content, "t.json").expect("parse"));
        assert_eq!(snap.groups.len(), 2);
        assert_eq!(snap.groups[0].tags, vec!["fun", "audio"]);
        assert!(snap.groups[1].tags.is_empty());
        assert_eq!(snap.captured_at, Some(Utc.with_ymd_and_hms(2024, 11, 2, 9, 30, 0).unwrap()));

        assert_eq!(snap.tabs.len(), 4);
        assert_eq!(snap.tabs[0].favicon_url.as_deref(), Some("https://bandcamp.com/fav.ico"));
        assert_eq!(snap.tabs[2].title, "https://radio.test");

        let positions: Vec<Option<u32>> =
            snap.tabs.iter().map(|t| t.membership.as_ref().map(|m| m.position)).collect();
        assert_eq!(positions, vec![Some(0), Some(0), Some(1), None]);
    }

    #[test]
    fn missing_fields_default_instead_of_failing() {
        let snap = structured(
            parse_snapshot(r#"{"tabs": [{"title": "no url"}, {"url": "https://a.test"}]}"#, "x")
                .expect("parse"),
        );
        assert!(snap.groups.is_empty());
        assert_eq!(snap.captured_at, None);
        assert_eq!(snap.tabs.len(), 1);
        assert_eq!(snap.tabs[0].url, "https://a.test");
    }

    #[test]
    fn object_without_tabs_is_an_empty_structured_snapshot() {
        let snap = structured(parse_snapshot(r#"{"groups": []}"#, "x").expect("parse"));
        assert!(snap.tabs.is_empty());
    }

    #[test]
    fn duplicate_group_names_collapse() {
        let snap = structured(
            parse_snapshot(
                r#"{"groups": [{"name": "Read", "tags": ["a"]}, {"name": "read", "tags": ["a", "b"]}], "tabs": []}"#,
                "x",
            )
            .expect("parse"),
        );
        assert_eq!(snap.groups.len(), 1);
        assert_eq!(snap.groups[0].name, "Read");
        assert_eq!(snap.groups[0].tags, vec!["a", "b"]);
    }

    #[test]
    fn parses_json_url_list() {
        let snap = parse_snapshot(r#"["https://a.test", "", 42, {"url": "https://b.test", "title": "B"}]"#, "x")
            .expect("parse");
        let Snapshot::UrlList(list) = snap else {
            panic!("expected url list");
        };
        assert_eq!(list.tabs.len(), 2);
        assert_eq!(list.tabs[0].title, "https://a.test");
        assert_eq!(list.tabs[1].title, "B");
        assert!(list.tabs.iter().all(|t| t.membership.is_none()));
    }

    #[test]
    fn falls_back_to_plain_text_lines() {
        let snap = parse_snapshot("https://a.test\n\n  https://b.test  \n", "x").expect("parse");
        let urls: Vec<&str> = snap.tabs().iter().map(|t| t.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.test", "https://b.test"]);
        assert!(snap.groups().is_empty());
    }

    #[test]
    fn empty_content_is_a_parse_error() {
        let err = parse_snapshot("  \n\n", "empty.txt").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("empty.txt"));
    }

    #[test]
    fn timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let secs = expected.timestamp();
        let millis = expected.timestamp_millis();
        for content in [
            format!(r#"{{"savedAt": {secs}, "tabs": []}}"#),
            format!(r#"{{"timestamp": {millis}, "tabs": []}}"#),
            r#"{"captured_at": "2024-01-02T03:04:05", "tabs": []}"#.to_string(),
            r#"{"saved_at": "2024-01-02T04:04:05+01:00", "tabs": []}"#.to_string(),
        ] {
            let snap = parse_snapshot(&content, "x").expect("parse");
            assert_eq!(snap.captured_at(), Some(expected), "content: {content}");
        }

        let snap = parse_snapshot(r#"{"timestamp": "yesterday", "tabs": []}"#, "x").expect("parse");
        assert_eq!(snap.captured_at(), None);
    }

    #[test]
    fn timestamps_beyond_year_9999_are_dropped() {
        // Microseconds read as milliseconds land in year 14645.
        let snap =
            parse_snapshot(r#"{"timestamp": 400000000000000, "tabs": []}"#, "x").expect("parse");
        assert_eq!(snap.captured_at(), None);

        let snap = parse_snapshot(r#"{"timestamp": "+12024-01-01T00:00:00Z", "tabs": []}"#, "x")
            .expect("parse");
        assert_eq!(snap.captured_at(), None);
    }

    #[test]
    fn member_urls_follow_positions() {
        let snap = parse_snapshot(
            r#"{"groups": [{"name": "g"}], "tabs": [
                {"url": "https://a.test", "group": "g"},
                {"url": "https://x.test"},
                {"url": "https://b.test", "group": {"name": "G"}}
            ]}"#,
            "x",
        )
        .expect("parse");
        assert_eq!(snap.member_urls("g"), vec!["https://a.test", "https://b.test"]);
    }
}
