use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub base_url: Option<String>,
    /// Take the client IP from the last `X-Forwarded-For` hop, the one the proxy appended.
    pub trust_forwarded_for: Option<bool>,

    pub throttle: Option<ThrottleConfig>,
    pub outbound: Option<OutboundFileConfig>,
    pub dns: Option<DnsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ThrottleConfig {
    pub base_block_secs: Option<u64>,
    pub escalated_block_secs: Option<u64>,
    pub cleanup_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct OutboundFileConfig {
    pub http_timeout_secs: Option<u64>,
    pub max_concurrent_deliveries: Option<usize>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DnsConfig {
    pub timeout_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_all_sections() {
        let config: FileConfig = toml::from_str(
            r#"
            db_dir = "/data"
            port = 4000
            logging_level = "headers"
            base_url = "https://blog.example.com"
            trust_forwarded_for = true

            [throttle]
            base_block_secs = 10
            escalated_block_secs = 600

            [outbound]
            max_concurrent_deliveries = 8
            user_agent = "my-blog"

            [dns]
            timeout_ms = 2000
            "#,
        )
        .unwrap();

        assert_eq!(config.db_dir.as_deref(), Some("/data"));
        assert_eq!(config.port, Some(4000));
        assert_eq!(config.trust_forwarded_for, Some(true));
        let throttle = config.throttle.unwrap();
        assert_eq!(throttle.base_block_secs, Some(10));
        assert_eq!(throttle.escalated_block_secs, Some(600));
        assert_eq!(throttle.cleanup_interval_secs, None);
        let outbound = config.outbound.unwrap();
        assert_eq!(outbound.max_concurrent_deliveries, Some(8));
        assert_eq!(outbound.http_timeout_secs, None);
        assert_eq!(config.dns.unwrap().timeout_ms, Some(2000));
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.db_dir.is_none());
        assert!(config.throttle.is_none());
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = FileConfig::load(Path::new("/nonexistent/backlink.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
