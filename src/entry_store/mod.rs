//! Minimal blog entry storage.
//!
//! The notification engine only needs to know whether an entry exists and
//! who may see it; publishing also needs somewhere to put new entries.

mod models;
mod schema;
mod sqlite_entry_store;

pub use models::*;
pub use schema::ENTRY_VERSIONED_SCHEMAS;
pub use sqlite_entry_store::SqliteEntryStore;

use anyhow::Result;

pub trait EntryStore: Send + Sync {
    fn create_entry(&self, entry: &NewEntry) -> Result<Entry>;
    fn get_entry(&self, id: i64) -> Result<Option<Entry>>;
}
