//! DNS-backed checks on hosts the server is asked to trust.
//!
//! Used for inbound ping urls, inbound author emails and outbound targets.
//! Anything that fails to parse or resolve is invalid.

mod resolver;

pub use resolver::{DomainResolver, StaticResolver, SystemResolver};

use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const MAX_HOSTNAME_LENGTH: usize = 253;
pub const MAX_LABEL_LENGTH: usize = 63;

const MIN_EMAIL_LENGTH: usize = 3;
const MAX_EMAIL_LENGTH: usize = 100;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$"
    )
    .unwrap();
}

#[derive(Clone)]
pub struct DomainValidator {
    resolver: Arc<dyn DomainResolver>,
}

impl DomainValidator {
    pub fn new(resolver: Arc<dyn DomainResolver>) -> Self {
        Self { resolver }
    }

    pub fn with_system_resolver(timeout: Duration) -> Self {
        Self::new(Arc::new(SystemResolver::new(timeout)))
    }

    pub async fn is_url_domain_valid(&self, url: &str) -> bool {
        match host_from_url(url) {
            Some(host) => self.is_host_valid(&host).await,
            None => false,
        }
    }

    pub async fn is_email_domain_valid(&self, address: &str) -> bool {
        match host_from_email(address) {
            Some(host) => self.is_host_valid(host).await,
            None => false,
        }
    }

    async fn is_host_valid(&self, host: &str) -> bool {
        is_hostname_well_formed(host) && self.resolver.resolves(host).await
    }
}

/// Hostname of an absolute url, without brackets for IPv6 literals.
pub fn host_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Everything after the last `@`.
pub fn host_from_email(address: &str) -> Option<&str> {
    let (_, domain) = address.trim().rsplit_once('@')?;
    if domain.is_empty() {
        None
    } else {
        Some(domain)
    }
}

pub fn is_hostname_well_formed(host: &str) -> bool {
    let host = host.strip_suffix('.').unwrap_or(host);
    !host.is_empty()
        && host.len() <= MAX_HOSTNAME_LENGTH
        && host
            .split('.')
            .all(|label| !label.is_empty() && label.len() <= MAX_LABEL_LENGTH)
}

/// Syntax-only email check. Does not look at DNS.
pub fn is_email_valid(address: &str) -> bool {
    let len = address.chars().count();
    (MIN_EMAIL_LENGTH..=MAX_EMAIL_LENGTH).contains(&len) && EMAIL_REGEX.is_match(address)
}
