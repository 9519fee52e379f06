use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt::Debug, path::PathBuf};
use tracing::{debug, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use backlink_server::abuse::{AbuseThrottle, InMemoryAbuseThrottle};
use backlink_server::config;
use backlink_server::domain_validator::DomainValidator;
use backlink_server::entry_store::{EntryStore, SqliteEntryStore};
use backlink_server::inbound::InboundPingReceiver;
use backlink_server::outbound::{OutboundDispatcher, OutboundNotifier};
use backlink_server::publishing::EntryPublisher;
use backlink_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use backlink_server::trackback_store::{SqliteTrackbackStore, TrackbackStore};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory containing database files (entries.db, trackbacks.db).
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Public base url of this blog, used to build entry permalinks in outbound pings.
    #[clap(long)]
    pub base_url: Option<String>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            base_url: args.base_url.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  port: {}", app_config.port);
    info!("  base_url: {}", app_config.base_url);

    info!("Initializing metrics...");
    metrics::init_metrics();

    info!("Opening entry store at {:?}...", app_config.entries_db_path());
    let entry_store: Arc<dyn EntryStore> =
        Arc::new(SqliteEntryStore::new(app_config.entries_db_path())?);

    info!(
        "Opening trackback store at {:?}...",
        app_config.trackbacks_db_path()
    );
    let trackback_store: Arc<dyn TrackbackStore> =
        Arc::new(SqliteTrackbackStore::new(app_config.trackbacks_db_path())?);

    let validator = DomainValidator::with_system_resolver(app_config.dns_timeout());
    let throttle: Arc<dyn AbuseThrottle> = Arc::new(InMemoryAbuseThrottle::new());

    let ping_receiver = Arc::new(InboundPingReceiver::new(
        entry_store.clone(),
        trackback_store.clone(),
        throttle.clone(),
        validator.clone(),
        app_config.throttle_policy(),
    ));

    let notifier = Arc::new(OutboundNotifier::new(
        app_config.outbound_config(),
        validator,
    )?);
    let dispatcher =
        OutboundDispatcher::new(notifier, app_config.outbound.max_concurrent_deliveries);
    let publisher = Arc::new(EntryPublisher::new(entry_store.clone(), dispatcher));

    // Spawn background task purging expired throttle blocks
    let cleanup_interval = Duration::from_secs(app_config.throttle.cleanup_interval_secs);
    let purging_throttle = throttle.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cleanup_interval);

        // Skip the first immediate tick, wait for the first interval
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let purged = purging_throttle.purge_expired();
            if purged > 0 {
                debug!("Purged {} expired throttle blocks", purged);
            }
        }
    });

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        trust_forwarded_for: app_config.trust_forwarded_for,
    };

    tokio::select! {
        result = run_server(
            server_config,
            app_config.metrics_port,
            entry_store,
            trackback_store,
            ping_receiver,
            publisher,
        ) => {
            info!("HTTP server stopped: {:?}", result);
            result
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
