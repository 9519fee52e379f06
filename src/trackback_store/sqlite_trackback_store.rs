use super::models::{NewNotification, NotificationRecord, NotificationType, SaveOutcome};
use super::schema::TRACKBACK_VERSIONED_SCHEMAS;
use super::TrackbackStore;
use crate::sqlite_persistence::open_versioned;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

const SELECT_COLUMNS: &str =
    "id, entry_id, date, subject, body, author_email, author_name, blog_name, url, type";

pub struct SqliteTrackbackStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTrackbackStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path.as_ref(), TRACKBACK_VERSIONED_SCHEMAS, "trackback")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<NotificationRecord> {
        let date_str: String = row.get("date")?;
        let type_str: String = row.get("type")?;
        Ok(NotificationRecord {
            id: row.get("id")?,
            entry_id: row.get("entry_id")?,
            date: DateTime::parse_from_rfc3339(&date_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            subject: row.get("subject")?,
            body: row.get("body")?,
            author_email: row.get("author_email")?,
            author_name: row.get("author_name")?,
            blog_name: row.get("blog_name")?,
            url: row.get("url")?,
            notification_type: NotificationType::parse(&type_str)
                .unwrap_or(NotificationType::Trackback),
        })
    }

    fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == ErrorCode::ConstraintViolation
                    && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

impl TrackbackStore for SqliteTrackbackStore {
    fn save(&self, notification: &NewNotification) -> Result<SaveOutcome> {
        let conn = self.conn.lock().unwrap();
        let date = Utc::now();
        let inserted = conn.execute(
            "INSERT INTO trackbacks
                (entry_id, date, subject, body, author_email, author_name, blog_name, url, type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                notification.entry_id(),
                Self::format_datetime(&date),
                notification.subject(),
                notification.body(),
                notification.author_email(),
                notification.author_name(),
                notification.blog_name(),
                notification.url(),
                notification.notification_type().as_str(),
            ],
        );

        match inserted {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                let record = notification
                    .clone()
                    .into_record(id, date)
                    .context("Store assigned an invalid id")?;
                Ok(SaveOutcome::Created(record))
            }
            Err(err) if Self::is_unique_violation(&err) => {
                debug!(
                    "Duplicate notification for entry {} from {}",
                    notification.entry_id(),
                    notification.url()
                );
                Ok(SaveOutcome::Duplicate)
            }
            Err(err) => Err(err).context("Failed to insert trackback"),
        }
    }

    fn get_by_id(&self, id: i64) -> Result<Option<NotificationRecord>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM trackbacks WHERE id = ?1", SELECT_COLUMNS),
            params![id],
            Self::row_to_record,
        )
        .optional()
        .context("Failed to get trackback by id")
    }

    fn get_by_entry(&self, entry_id: i64) -> Result<Vec<NotificationRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM trackbacks WHERE entry_id = ?1 ORDER BY date ASC, id ASC",
            SELECT_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![entry_id], Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list trackbacks for entry")?;
        Ok(records)
    }

    fn exists(&self, entry_id: i64, url: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let found = conn
            .query_row(
                "SELECT 1 FROM trackbacks WHERE entry_id = ?1 AND url = ?2",
                params![entry_id, url],
                |_| Ok(()),
            )
            .optional()
            .context("Failed to check trackback existence")?;
        Ok(found.is_some())
    }

    fn delete_by_id(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn
            .execute("DELETE FROM trackbacks WHERE id = ?1", params![id])
            .context("Failed to delete trackback")?;
        Ok(deleted > 0)
    }

    fn count_for_entry(&self, entry_id: i64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM trackbacks WHERE entry_id = ?1",
                params![entry_id],
                |row| row.get(0),
            )
            .context("Failed to count trackbacks")?;
        Ok(count as usize)
    }
}
