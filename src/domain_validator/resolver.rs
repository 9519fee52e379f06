use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

/// Answers whether a hostname resolves to at least one address.
#[async_trait]
pub trait DomainResolver: Send + Sync {
    async fn resolves(&self, host: &str) -> bool;
}

/// Resolves through the operating system, bounded by a timeout.
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl DomainResolver for SystemResolver {
    async fn resolves(&self, host: &str) -> bool {
        let lookup = tokio::net::lookup_host((host, 0));
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(mut addrs)) => addrs.next().is_some(),
            Ok(Err(err)) => {
                debug!("DNS lookup for {} failed: {}", host, err);
                false
            }
            Err(_) => {
                debug!("DNS lookup for {} timed out after {:?}", host, self.timeout);
                false
            }
        }
    }
}

/// Fixed set of hosts that resolve. Everything else does not.
#[derive(Default, Clone)]
pub struct StaticResolver {
    hosts: HashSet<String>,
}

impl StaticResolver {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| h.into().to_ascii_lowercase())
                .collect(),
        }
    }
}

#[async_trait]
impl DomainResolver for StaticResolver {
    async fn resolves(&self, host: &str) -> bool {
        self.hosts.contains(&host.to_ascii_lowercase())
    }
}
