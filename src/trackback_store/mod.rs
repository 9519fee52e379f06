mod models;
mod schema;
mod sqlite_trackback_store;

pub use models::*;
pub use schema::TRACKBACK_VERSIONED_SCHEMAS;
pub use sqlite_trackback_store::SqliteTrackbackStore;

use anyhow::Result;

/// Persistence for inbound notifications.
///
/// `save` must be atomic per (entry_id, url): concurrent duplicates end up
/// as one stored record and [`SaveOutcome::Duplicate`] for the rest.
pub trait TrackbackStore: Send + Sync {
    fn save(&self, notification: &NewNotification) -> Result<SaveOutcome>;
    fn get_by_id(&self, id: i64) -> Result<Option<NotificationRecord>>;
    /// Records for an entry, oldest first.
    fn get_by_entry(&self, entry_id: i64) -> Result<Vec<NotificationRecord>>;
    fn exists(&self, entry_id: i64, url: &str) -> Result<bool>;
    fn delete_by_id(&self, id: i64) -> Result<bool>;
    fn count_for_entry(&self, entry_id: i64) -> Result<usize>;
}
