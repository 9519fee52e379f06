use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

const ENTRIES_TABLE_V1: Table = Table {
    name: "entries",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("username", &SqlType::Text, non_null = true),
        sqlite_column!("blog_name", &SqlType::Text, non_null = true),
        sqlite_column!("subject", &SqlType::Text, non_null = true),
        sqlite_column!("body", &SqlType::Text, non_null = true),
        sqlite_column!("security", &SqlType::Text, non_null = true),
        sqlite_column!("trackback_url", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_entries_username", "username")],
    unique_constraints: &[],
};

pub const ENTRY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[ENTRIES_TABLE_V1],
    migration: None,
}];
