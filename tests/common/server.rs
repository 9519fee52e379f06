//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own databases.

use super::constants::*;
use super::fixtures::create_test_db_with_entries;
use backlink_server::abuse::{InMemoryAbuseThrottle, ThrottlePolicy};
use backlink_server::domain_validator::{DomainValidator, StaticResolver};
use backlink_server::entry_store::{EntryStore, SqliteEntryStore};
use backlink_server::inbound::InboundPingReceiver;
use backlink_server::outbound::{OutboundConfig, OutboundDispatcher, OutboundNotifier};
use backlink_server::publishing::EntryPublisher;
use backlink_server::server::{server::make_app, RequestsLoggingLevel, ServerConfig};
use backlink_server::trackback_store::{SqliteTrackbackStore, TrackbackStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated databases
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Entry store for direct database access in tests
    pub entry_store: Arc<dyn EntryStore>,

    /// Trackback store for direct database access in tests
    pub trackback_store: Arc<dyn TrackbackStore>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// This function:
    /// 1. Creates a temporary entries database with seeded entries
    /// 2. Wires the stores with a fixed-set resolver instead of DNS
    /// 3. Binds to a random port (127.0.0.1:0)
    /// 4. Spawns the server in a background task
    /// 5. Waits for the server to be ready
    ///
    /// Client IPs are taken from `X-Forwarded-For` so tests can act as
    /// distinct callers.
    pub async fn spawn() -> Self {
        let (temp_db_dir, entries_db_path) =
            create_test_db_with_entries().expect("Failed to create test database");

        let entry_store: Arc<dyn EntryStore> = Arc::new(
            SqliteEntryStore::new(&entries_db_path).expect("Failed to open entry store"),
        );
        let trackback_store: Arc<dyn TrackbackStore> = Arc::new(
            SqliteTrackbackStore::new(temp_db_dir.path().join("trackbacks.db"))
                .expect("Failed to open trackback store"),
        );

        let validator = DomainValidator::new(Arc::new(StaticResolver::new(
            RESOLVABLE_HOSTS.iter().copied(),
        )));

        let ping_receiver = Arc::new(InboundPingReceiver::new(
            entry_store.clone(),
            trackback_store.clone(),
            Arc::new(InMemoryAbuseThrottle::new()),
            validator.clone(),
            ThrottlePolicy::default(),
        ));

        let notifier = OutboundNotifier::new(
            OutboundConfig {
                base_url: TEST_BLOG_BASE_URL.to_string(),
                http_timeout: Duration::from_secs(2),
                ..OutboundConfig::default()
            },
            validator,
        )
        .expect("Failed to build outbound notifier");
        let publisher = Arc::new(EntryPublisher::new(
            entry_store.clone(),
            OutboundDispatcher::new(Arc::new(notifier), 2),
        ));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            trust_forwarded_for: true,
        };

        let app = make_app(
            config,
            entry_store.clone(),
            trackback_store.clone(),
            ping_receiver,
            publisher,
        )
        .expect("Failed to build app");

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        // Wait for server to be ready
        let server = Self {
            base_url,
            port,
            entry_store,
            trackback_store,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    return;
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
        // TempDir will be cleaned up automatically
    }
}
