//! SQLite schema for the trackbacks database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

const TRACKBACKS_TABLE_V1: Table = Table {
    name: "trackbacks",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("entry_id", &SqlType::Integer, non_null = true),
        // RFC 3339 with fixed millisecond precision, so text order is time order
        sqlite_column!("date", &SqlType::Text, non_null = true),
        sqlite_column!("subject", &SqlType::Text, non_null = true),
        sqlite_column!("body", &SqlType::Text, non_null = true),
        sqlite_column!("author_email", &SqlType::Text, non_null = true),
        sqlite_column!("author_name", &SqlType::Text, non_null = true),
        sqlite_column!("blog_name", &SqlType::Text, non_null = true),
        sqlite_column!("url", &SqlType::Text, non_null = true),
        sqlite_column!("type", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_trackbacks_entry_date", "entry_id, date")],
    unique_constraints: &[&["entry_id", "url"]],
};

pub const TRACKBACK_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[TRACKBACKS_TABLE_V1],
    migration: None,
}];
