//! SQLite schema for the archive.

use rusqlite::Connection;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: i64 = 3;

pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tab (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            url TEXT NOT NULL UNIQUE,
            favicon_url TEXT
        );

        CREATE TABLE IF NOT EXISTS tab_group (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            tags_json TEXT NOT NULL DEFAULT '[]',
            url_hash TEXT NOT NULL,
            saved_at TEXT
        );

        CREATE TABLE IF NOT EXISTS tab_group_tab (
            tab_id INTEGER NOT NULL REFERENCES tab(id),
            group_id INTEGER NOT NULL REFERENCES tab_group(id),
            position INTEGER NOT NULL,
            UNIQUE (tab_id, group_id),
            UNIQUE (group_id, position)
        );

        CREATE TABLE IF NOT EXISTS email (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            message_id TEXT NOT NULL UNIQUE,
            sender TEXT NOT NULL,
            recipient_json TEXT NOT NULL DEFAULT '[]',
            subject TEXT NOT NULL,
            body TEXT NOT NULL,
            date TEXT,
            labels_json TEXT NOT NULL DEFAULT '[]'
        );

        -- rowid mirrors email.id
        CREATE VIRTUAL TABLE IF NOT EXISTS email_fts USING fts5(
            subject,
            sender,
            body
        );

        CREATE INDEX IF NOT EXISTS idx_tab_group_name_key ON tab_group(name_key);
        CREATE INDEX IF NOT EXISTS idx_tab_group_saved_at ON tab_group(saved_at);
        CREATE INDEX IF NOT EXISTS idx_tab_group_tab_group ON tab_group_tab(group_id, position);
        CREATE INDEX IF NOT EXISTS idx_email_date ON email(date);
        ",
    )?;

    let current: Option<i64> =
        conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0)).ok();
    match current {
        None => {
            conn.execute("INSERT INTO schema_version(version) VALUES(?1)", [SCHEMA_VERSION])?;
        }
        Some(version) if version == SCHEMA_VERSION => {}
        Some(1 | 2) => {
            rebuild_email_index(conn)?;
            conn.execute("UPDATE schema_version SET version = ?1", [SCHEMA_VERSION])?;
        }
        Some(version) => {
            return Err(Error::InvalidRequest(format!(
                "Unsupported archive schema version {version}; expected {SCHEMA_VERSION}"
            )));
        }
    }
    Ok(())
}

/// Versions 1 and 2 keyed email by message id alone and either lacked the
/// full-text index or matched it by an unindexed column. Rebuild both so that
/// each index row shares its rowid with `email.id`.
fn rebuild_email_index(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        BEGIN;
        ALTER TABLE email RENAME TO email_old;
        CREATE TABLE email (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            message_id TEXT NOT NULL UNIQUE,
            sender TEXT NOT NULL,
            recipient_json TEXT NOT NULL DEFAULT '[]',
            subject TEXT NOT NULL,
            body TEXT NOT NULL,
            date TEXT,
            labels_json TEXT NOT NULL DEFAULT '[]'
        );
        INSERT INTO email (message_id, sender, recipient_json, subject, body, date, labels_json)
            SELECT message_id, sender, recipient_json, subject, body, date, labels_json
            FROM email_old ORDER BY rowid;
        DROP TABLE email_old;
        CREATE INDEX IF NOT EXISTS idx_email_date ON email(date);

        DROP TABLE IF EXISTS email_fts;
        CREATE VIRTUAL TABLE email_fts USING fts5(subject, sender, body);
        INSERT INTO email_fts (rowid, subject, sender, body)
            SELECT id, subject, sender, body FROM email;
        COMMIT;
        ",
    )?;
    Ok(())
}
