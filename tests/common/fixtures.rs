//! Test fixture creation for the entries database
//!
//! Entries are inserted with direct SQL so they keep the fixed ids the
//! tests refer to.

use super::constants::*;
use anyhow::Result;
use backlink_server::entry_store::SqliteEntryStore;
use rusqlite::{params, Connection};
use std::path::PathBuf;
use tempfile::TempDir;

/// Creates a temporary db directory holding `entries.db` with one public,
/// one private and one friends-only entry.
/// Returns (temp_dir, entries_db_path)
pub fn create_test_db_with_entries() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("entries.db");

    // Let the store lay down the schema, then release the file
    drop(SqliteEntryStore::new(&db_path)?);

    let conn = Connection::open(&db_path)?;
    let seeded = [
        (PUBLIC_ENTRY_ID, "public", "A public post"),
        (PRIVATE_ENTRY_ID, "private", "A private post"),
        (FRIENDS_ENTRY_ID, "friends", "A friends-only post"),
    ];
    for (id, security, subject) in seeded {
        conn.execute(
            "INSERT INTO entries (id, username, blog_name, subject, body, security, trackback_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)",
            params![id, ENTRY_OWNER, "Test Blog", subject, "Body text", security],
        )?;
    }

    Ok((dir, db_path))
}
