use super::models::{Entry, NewEntry, Security};
use super::schema::ENTRY_VERSIONED_SCHEMAS;
use super::EntryStore;
use crate::sqlite_persistence::open_versioned;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct SqliteEntryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEntryStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path.as_ref(), ENTRY_VERSIONED_SCHEMAS, "entry")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<Entry> {
        let security_str: String = row.get("security")?;
        let created_at: i64 = row.get("created_at")?;
        Ok(Entry {
            id: row.get("id")?,
            username: row.get("username")?,
            blog_name: row.get("blog_name")?,
            subject: row.get("subject")?,
            body: row.get("body")?,
            // Unknown values are treated as the most restrictive level
            security: Security::parse(&security_str).unwrap_or(Security::Private),
            trackback_url: row.get("trackback_url")?,
            created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
        })
    }
}

impl EntryStore for SqliteEntryStore {
    fn create_entry(&self, entry: &NewEntry) -> Result<Entry> {
        let conn = self.conn.lock().unwrap();
        let created_at = Utc::now().timestamp();
        conn.execute(
            "INSERT INTO entries (username, blog_name, subject, body, security, trackback_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.username,
                entry.blog_name,
                entry.subject,
                entry.body,
                entry.security.as_str(),
                entry.trackback_url,
                created_at,
            ],
        )
        .context("Failed to insert entry")?;
        let id = conn.last_insert_rowid();

        Ok(Entry {
            id,
            username: entry.username.clone(),
            blog_name: entry.blog_name.clone(),
            subject: entry.subject.clone(),
            body: entry.body.clone(),
            security: entry.security,
            trackback_url: entry.trackback_url.clone(),
            created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
        })
    }

    fn get_entry(&self, id: i64) -> Result<Option<Entry>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, username, blog_name, subject, body, security, trackback_url, created_at
             FROM entries WHERE id = ?1",
            params![id],
            Self::row_to_entry,
        )
        .optional()
        .context("Failed to get entry")
    }
}
