//! Normalized tab snapshots.
//!
//! A snapshot is what one export file contains: optionally some named groups and a
//! list of tabs. Structured exports carry groups, tags and a capture time; bare URL
//! lists carry only tabs. Downstream code matches on the variant instead of probing
//! for optional fields.

use chrono::{DateTime, Utc};

pub mod parser;

pub use parser::{parse_snapshot, parse_snapshot_file};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
    Structured(StructuredSnapshot),
    UrlList(UrlListSnapshot),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredSnapshot {
    pub groups: Vec<GroupSpec>,
    pub tabs: Vec<SnapshotTab>,
    pub captured_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlListSnapshot {
    pub tabs: Vec<SnapshotTab>,
}

/// A group declared by the export. Names are matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub name: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotTab {
    pub title: String,
    pub url: String,
    pub favicon_url: Option<String>,
    pub membership: Option<Membership>,
}

/// The group a tab declared and its zero-based ordinal among that group's tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub group: String,
    pub position: u32,
}

impl Snapshot {
    pub fn groups(&self) -> &[GroupSpec] {
        match self {
            Snapshot::Structured(s) => &s.groups,
            Snapshot::UrlList(_) => &[],
        }
    }

    pub fn tabs(&self) -> &[SnapshotTab] {
        match self {
            Snapshot::Structured(s) => &s.tabs,
            Snapshot::UrlList(s) => &s.tabs,
        }
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Snapshot::Structured(s) => s.captured_at,
            Snapshot::UrlList(_) => None,
        }
    }

    /// URLs of the tabs that declared `group_key` (already folded), in position order.
    pub fn member_urls(&self, group_key: &str) -> Vec<&str> {
        let mut members: Vec<(u32, &str)> = self
            .tabs()
            .iter()
            .filter_map(|tab| {
                let membership = tab.membership.as_ref()?;
                (group_key_of(&membership.group) == group_key)
                    .then_some((membership.position, tab.url.as_str()))
            })
            .collect();
        members.sort_by_key(|(position, _)| *position);
        members.into_iter().map(|(_, url)| url).collect()
    }
}

impl SnapshotTab {
    pub fn bare(url: impl Into<String>) -> Self {
        let url = url.into();
        Self { title: url.clone(), url, favicon_url: None, membership: None }
    }
}

/// Case-folded lookup key for group names.
pub fn group_key_of(name: &str) -> String {
    name.trim().to_lowercase()
}
