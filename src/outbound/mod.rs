//! Outbound trackback delivery.
//!
//! Every delivery is a single best-effort attempt: check the target's
//! domain, fetch the page, discover its endpoint, post the ping. Failures
//! are logged and reported as `false`, never as errors.

mod dispatcher;

pub use dispatcher::OutboundDispatcher;

use crate::autodiscovery::discover_endpoint;
use crate::domain_validator::DomainValidator;
use crate::server::metrics::record_outbound_delivery;
use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Marker a receiver puts in its reply when it accepted the ping.
pub const SUCCESS_MARKER: &str = "<error>0</error>";

/// Largest page or ping reply read from a remote site.
pub const DEFAULT_MAX_PAGE_BYTES: usize = 1024 * 1024;

lazy_static! {
    static ref BODY_URL_REGEX: Regex = Regex::new(r#"https?://[^\s"'<>()\[\]{}]+"#).unwrap();
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("domain of {0} did not validate")]
    DomainRejected(String),
    #[error("could not fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("no trackback endpoint found on {0}")]
    NoEndpoint(String),
    #[error("ping to {endpoint} failed: {source}")]
    Post {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("ping to {0} was not acknowledged")]
    NotAcknowledged(String),
}

impl DeliveryError {
    fn label(&self) -> &'static str {
        match self {
            DeliveryError::DomainRejected(_) => "domain_rejected",
            DeliveryError::Fetch { .. } => "fetch_failed",
            DeliveryError::NoEndpoint(_) => "no_endpoint",
            DeliveryError::Post { .. } => "post_failed",
            DeliveryError::NotAcknowledged(_) => "not_acknowledged",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutboundConfig {
    /// Public root of this server, used to build permalinks.
    pub base_url: String,
    pub http_timeout: Duration,
    pub user_agent: String,
    pub max_page_bytes: usize,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            http_timeout: Duration::from_secs(10),
            user_agent: format!("backlink-server/{}", env!("CARGO_PKG_VERSION")),
            max_page_bytes: DEFAULT_MAX_PAGE_BYTES,
        }
    }
}

/// What gets announced about a local entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingContent {
    pub entry_id: i64,
    pub username: String,
    pub blog_name: String,
    pub subject: String,
    pub body: String,
}

pub struct OutboundNotifier {
    client: reqwest::Client,
    validator: DomainValidator,
    base_url: String,
    max_page_bytes: usize,
}

impl OutboundNotifier {
    pub fn new(config: OutboundConfig, validator: DomainValidator) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(config.user_agent)
            .build()
            .context("Failed to create outbound HTTP client")?;

        Ok(Self {
            client,
            validator,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_page_bytes: config.max_page_bytes,
        })
    }

    pub fn permalink(&self, username: &str, entry_id: i64) -> String {
        format!("{}/users/{}/entry/{}", self.base_url, username, entry_id)
    }

    /// Delivers one ping to the page at `candidate_url`. True only if the
    /// receiver acknowledged it.
    pub async fn notify(&self, candidate_url: &str, ping: &PingContent) -> bool {
        match self.try_notify(candidate_url, ping).await {
            Ok(endpoint) => {
                info!(
                    "Performed trackback ping for entry {} on {}",
                    ping.entry_id, endpoint
                );
                record_outbound_delivery("success");
                true
            }
            Err(err) => {
                match &err {
                    DeliveryError::NoEndpoint(_) | DeliveryError::DomainRejected(_) => {
                        debug!("Skipping trackback for entry {}: {}", ping.entry_id, err)
                    }
                    _ => warn!("Trackback for entry {} failed: {}", ping.entry_id, err),
                }
                record_outbound_delivery(err.label());
                false
            }
        }
    }

    /// Pings the explicit target first, then every other url in the body.
    /// Returns how many pings were acknowledged.
    pub async fn notify_for_entry(&self, explicit_target: Option<&str>, ping: &PingContent) -> usize {
        let explicit_target = explicit_target.map(str::trim).filter(|t| !t.is_empty());
        let mut delivered = 0;

        if let Some(target) = explicit_target {
            if self.notify(target, ping).await {
                delivered += 1;
            }
        }

        for candidate in candidate_urls(&ping.body, explicit_target) {
            if self.notify(&candidate, ping).await {
                delivered += 1;
            }
        }
        delivered
    }

    async fn try_notify(&self, candidate_url: &str, ping: &PingContent) -> Result<String, DeliveryError> {
        if !self.validator.is_url_domain_valid(candidate_url).await {
            return Err(DeliveryError::DomainRejected(candidate_url.to_string()));
        }

        let html = self.fetch_page(candidate_url).await?;
        let endpoint = discover_endpoint(&html)
            .ok_or_else(|| DeliveryError::NoEndpoint(candidate_url.to_string()))?;

        let permalink = self.permalink(&ping.username, ping.entry_id);
        self.send_ping(&endpoint, &permalink, ping).await?;
        Ok(endpoint)
    }

    async fn fetch_page(&self, url: &str) -> Result<String, DeliveryError> {
        let fetch_error = |reason: String| DeliveryError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_error(format!("status {}", response.status())));
        }
        read_capped(response, self.max_page_bytes)
            .await
            .map_err(|e| fetch_error(e.to_string()))?
            .ok_or_else(|| fetch_error(format!("page larger than {} bytes", self.max_page_bytes)))
    }

    /// Posts the form-encoded ping to an already discovered endpoint.
    pub async fn send_ping(
        &self,
        endpoint: &str,
        permalink: &str,
        ping: &PingContent,
    ) -> Result<(), DeliveryError> {
        let post_error = |source: reqwest::Error| DeliveryError::Post {
            endpoint: endpoint.to_string(),
            source,
        };

        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded; charset=utf-8")
            .header(ACCEPT, "text/xml")
            .body(encode_ping_form(permalink, ping))
            .send()
            .await
            .map_err(post_error)?;
        let body = read_capped(response, self.max_page_bytes)
            .await
            .map_err(post_error)?
            .unwrap_or_default();

        if body.contains(SUCCESS_MARKER) {
            Ok(())
        } else {
            Err(DeliveryError::NotAcknowledged(endpoint.to_string()))
        }
    }
}

/// Reads the body up to `limit` bytes. `None` when the body is larger.
async fn read_capped(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Option<String>, reqwest::Error> {
    if response
        .content_length()
        .is_some_and(|length| length > limit as u64)
    {
        return Ok(None);
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if bytes.len() + chunk.len() > limit {
            return Ok(None);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

fn encode_ping_form(permalink: &str, ping: &PingContent) -> String {
    [
        ("title", ping.subject.as_str()),
        ("url", permalink),
        ("blog_name", ping.blog_name.as_str()),
        ("excerpt", ping.body.as_str()),
    ]
    .iter()
    .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
    .collect::<Vec<_>>()
    .join("&")
}

/// Absolute http(s) urls in `body`, in order of first appearance, without
/// duplicates and without `exclude`.
pub fn candidate_urls(body: &str, exclude: Option<&str>) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for m in BODY_URL_REGEX.find_iter(body) {
        let url = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
        if Some(url) == exclude || urls.iter().any(|u| u == url) {
            continue;
        }
        urls.push(url.to_string());
    }
    urls
}
