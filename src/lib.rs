//! Backlink Server Library
//!
//! Trackback and post-it notifications between blogs: receiving pings for
//! local entries and announcing new entries to the pages they link to.

pub mod abuse;
pub mod autodiscovery;
pub mod config;
pub mod domain_validator;
pub mod entry_store;
pub mod inbound;
pub mod outbound;
pub mod publishing;
pub mod server;
pub mod sqlite_persistence;
pub mod trackback_store;

// Re-export commonly used types for convenience
pub use abuse::{AbuseThrottle, InMemoryAbuseThrottle, ThrottlePolicy};
pub use entry_store::{EntryStore, SqliteEntryStore};
pub use inbound::InboundPingReceiver;
pub use publishing::EntryPublisher;
pub use server::{run_server, RequestsLoggingLevel};
pub use trackback_store::{SqliteTrackbackStore, TrackbackStore};
