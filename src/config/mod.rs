mod file_config;

pub use file_config::{DnsConfig, FileConfig, OutboundFileConfig, ThrottleConfig};

use crate::abuse::ThrottlePolicy;
use crate::outbound::OutboundConfig;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

const MAX_DNS_TIMEOUT_MS: u64 = 10_000;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub base_url: String,
    pub trust_forwarded_for: bool,

    pub throttle: ThrottleSettings,
    pub outbound: OutboundSettings,
    pub dns: DnsSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleSettings {
    pub base_block_secs: u64,
    pub escalated_block_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            base_block_secs: 5,
            escalated_block_secs: 300,
            cleanup_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSettings {
    pub http_timeout_secs: u64,
    pub max_concurrent_deliveries: usize,
    pub user_agent: String,
}

impl Default for OutboundSettings {
    fn default() -> Self {
        Self {
            http_timeout_secs: 10,
            max_concurrent_deliveries: 4,
            user_agent: format!("backlink-server/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsSettings {
    pub timeout_ms: u64,
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self { timeout_ms: 3000 }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let base_url = file
            .base_url
            .or_else(|| cli.base_url.clone())
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        let trust_forwarded_for = file.trust_forwarded_for.unwrap_or(false);

        let throttle_defaults = ThrottleSettings::default();
        let throttle_file = file.throttle.unwrap_or_default();
        let throttle = ThrottleSettings {
            base_block_secs: throttle_file
                .base_block_secs
                .unwrap_or(throttle_defaults.base_block_secs),
            escalated_block_secs: throttle_file
                .escalated_block_secs
                .unwrap_or(throttle_defaults.escalated_block_secs),
            cleanup_interval_secs: throttle_file
                .cleanup_interval_secs
                .unwrap_or(throttle_defaults.cleanup_interval_secs),
        };
        if throttle.escalated_block_secs <= throttle.base_block_secs {
            bail!(
                "escalated_block_secs ({}) must be greater than base_block_secs ({})",
                throttle.escalated_block_secs,
                throttle.base_block_secs
            );
        }
        if throttle.cleanup_interval_secs == 0 {
            bail!("cleanup_interval_secs must be greater than zero");
        }

        let outbound_defaults = OutboundSettings::default();
        let outbound_file = file.outbound.unwrap_or_default();
        let outbound = OutboundSettings {
            http_timeout_secs: outbound_file
                .http_timeout_secs
                .unwrap_or(outbound_defaults.http_timeout_secs),
            max_concurrent_deliveries: outbound_file
                .max_concurrent_deliveries
                .unwrap_or(outbound_defaults.max_concurrent_deliveries),
            user_agent: outbound_file
                .user_agent
                .unwrap_or(outbound_defaults.user_agent),
        };
        if outbound.max_concurrent_deliveries == 0 {
            bail!("max_concurrent_deliveries must be at least 1");
        }

        let dns = DnsSettings {
            timeout_ms: file
                .dns
                .and_then(|d| d.timeout_ms)
                .unwrap_or(DnsSettings::default().timeout_ms),
        };
        if dns.timeout_ms == 0 || dns.timeout_ms > MAX_DNS_TIMEOUT_MS {
            bail!(
                "dns timeout_ms must be between 1 and {}, got {}",
                MAX_DNS_TIMEOUT_MS,
                dns.timeout_ms
            );
        }

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            base_url,
            trust_forwarded_for,
            throttle,
            outbound,
            dns,
        })
    }

    pub fn entries_db_path(&self) -> PathBuf {
        self.db_dir.join("entries.db")
    }

    pub fn trackbacks_db_path(&self) -> PathBuf {
        self.db_dir.join("trackbacks.db")
    }

    pub fn throttle_policy(&self) -> ThrottlePolicy {
        ThrottlePolicy {
            base_block: Duration::from_secs(self.throttle.base_block_secs),
            escalated_block: Duration::from_secs(self.throttle.escalated_block_secs),
        }
    }

    pub fn outbound_config(&self) -> OutboundConfig {
        OutboundConfig {
            base_url: self.base_url.clone(),
            http_timeout: Duration::from_secs(self.outbound.http_timeout_secs),
            user_agent: self.outbound.user_agent.clone(),
            ..OutboundConfig::default()
        }
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns.timeout_ms)
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
