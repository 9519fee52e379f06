use axum::extract::FromRef;

use crate::entry_store::EntryStore;
use crate::inbound::InboundPingReceiver;
use crate::publishing::EntryPublisher;
use crate::trackback_store::TrackbackStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedEntryStore = Arc<dyn EntryStore>;
pub type GuardedTrackbackStore = Arc<dyn TrackbackStore>;
pub type GuardedPingReceiver = Arc<InboundPingReceiver>;
pub type GuardedPublisher = Arc<EntryPublisher>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub entry_store: GuardedEntryStore,
    pub trackback_store: GuardedTrackbackStore,
    pub ping_receiver: GuardedPingReceiver,
    pub publisher: GuardedPublisher,
    pub hash: String,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedEntryStore {
    fn from_ref(input: &ServerState) -> Self {
        input.entry_store.clone()
    }
}

impl FromRef<ServerState> for GuardedTrackbackStore {
    fn from_ref(input: &ServerState) -> Self {
        input.trackback_store.clone()
    }
}

impl FromRef<ServerState> for GuardedPingReceiver {
    fn from_ref(input: &ServerState) -> Self {
        input.ping_receiver.clone()
    }
}

impl FromRef<ServerState> for GuardedPublisher {
    fn from_ref(input: &ServerState) -> Self {
        input.publisher.clone()
    }
}
