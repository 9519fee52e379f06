//! Storing a new entry and announcing it to the pages it links to.

use crate::entry_store::{Entry, EntryStore, NewEntry};
use crate::outbound::{OutboundDispatcher, PingContent};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct Published {
    pub entry: Entry,
    /// Background delivery, if any was started. Dropping it does not cancel it.
    pub delivery: Option<JoinHandle<usize>>,
}

pub struct EntryPublisher {
    entries: Arc<dyn EntryStore>,
    dispatcher: OutboundDispatcher,
}

impl EntryPublisher {
    pub fn new(entries: Arc<dyn EntryStore>, dispatcher: OutboundDispatcher) -> Self {
        Self {
            entries,
            dispatcher,
        }
    }

    /// Persists `entry` and, for public entries, hands outbound pings to the
    /// dispatcher. Returns once the entry is stored; delivery outcomes
    /// never reach the caller. Must be called from within a tokio runtime.
    pub fn publish(&self, entry: NewEntry) -> Result<Published> {
        let stored = self
            .entries
            .create_entry(&entry)
            .context("Failed to store published entry")?;

        if !stored.security.is_public() {
            debug!("Entry {} is not public, skipping trackbacks", stored.id);
            return Ok(Published {
                entry: stored,
                delivery: None,
            });
        }

        let ping = PingContent {
            entry_id: stored.id,
            username: stored.username.clone(),
            blog_name: stored.blog_name.clone(),
            subject: stored.subject.clone(),
            body: stored.body.clone(),
        };
        let delivery = self.dispatcher.dispatch(stored.trackback_url.clone(), ping);

        Ok(Published {
            entry: stored,
            delivery: Some(delivery),
        })
    }
}
