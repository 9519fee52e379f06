use super::{OutboundNotifier, PingContent};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Runs deliveries in the background, at most `max_concurrent` at a time.
///
/// Nothing is queued durably: work in flight is lost on shutdown.
#[derive(Clone)]
pub struct OutboundDispatcher {
    notifier: Arc<OutboundNotifier>,
    permits: Arc<Semaphore>,
}

impl OutboundDispatcher {
    pub fn new(notifier: Arc<OutboundNotifier>, max_concurrent: usize) -> Self {
        Self {
            notifier,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Spawns delivery for an entry and returns immediately. The handle
    /// resolves to the number of acknowledged pings; callers may drop it.
    pub fn dispatch(&self, explicit_target: Option<String>, ping: PingContent) -> JoinHandle<usize> {
        let notifier = self.notifier.clone();
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("Outbound dispatcher closed, dropping pings for entry {}", ping.entry_id);
                    return 0;
                }
            };
            let delivered = notifier
                .notify_for_entry(explicit_target.as_deref(), &ping)
                .await;
            debug!(
                "Outbound delivery for entry {} finished, {} acknowledged",
                ping.entry_id, delivered
            );
            delivered
        })
    }

    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }
}
