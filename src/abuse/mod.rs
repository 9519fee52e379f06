//! IP-keyed abuse throttle.
//!
//! The throttle only knows "blocked until T". Callers pick the duration:
//! a short base block for a first failed attempt, a longer escalated one
//! for an IP that comes back while still blocked.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Block durations applied by the inbound receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottlePolicy {
    pub base_block: Duration,
    pub escalated_block: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            base_block: Duration::from_secs(5),
            escalated_block: Duration::from_secs(300),
        }
    }
}

/// Shared throttle state. Every method is atomic per IP.
pub trait AbuseThrottle: Send + Sync {
    fn is_blocked(&self, ip: &str) -> bool;

    /// Blocks `ip` for `duration` from now, replacing any existing block.
    fn block(&self, ip: &str, duration: Duration);

    fn clear(&self, ip: &str);

    /// If `ip` is blocked, re-arms the block for `duration` from now and
    /// returns true. Check and re-arm happen under one lock so concurrent
    /// requests from a flooding IP cannot slip past escalation.
    fn extend_if_blocked(&self, ip: &str, duration: Duration) -> bool;

    /// Time left on the block, if any.
    fn remaining(&self, ip: &str) -> Option<Duration>;

    /// Drops expired entries. Returns how many were removed.
    fn purge_expired(&self) -> usize;
}

#[derive(Default)]
pub struct InMemoryAbuseThrottle {
    blocked_until: Mutex<HashMap<String, Instant>>,
}

impl InMemoryAbuseThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocked_until.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AbuseThrottle for InMemoryAbuseThrottle {
    fn is_blocked(&self, ip: &str) -> bool {
        self.remaining(ip).is_some()
    }

    fn block(&self, ip: &str, duration: Duration) {
        let mut map = self.blocked_until.lock().unwrap();
        map.insert(ip.to_string(), Instant::now() + duration);
    }

    fn clear(&self, ip: &str) {
        self.blocked_until.lock().unwrap().remove(ip);
    }

    fn extend_if_blocked(&self, ip: &str, duration: Duration) -> bool {
        let mut map = self.blocked_until.lock().unwrap();
        let now = Instant::now();
        match map.get_mut(ip) {
            Some(until) if *until > now => {
                *until = now + duration;
                true
            }
            Some(_) => {
                map.remove(ip);
                false
            }
            None => false,
        }
    }

    fn remaining(&self, ip: &str) -> Option<Duration> {
        let map = self.blocked_until.lock().unwrap();
        map.get(ip)
            .and_then(|until| until.checked_duration_since(Instant::now()))
            .filter(|left| !left.is_zero())
    }

    fn purge_expired(&self) -> usize {
        let mut map = self.blocked_until.lock().unwrap();
        let now = Instant::now();
        let before = map.len();
        map.retain(|_, until| *until > now);
        before - map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn unknown_ip_is_not_blocked() {
        let throttle = InMemoryAbuseThrottle::new();
        assert!(!throttle.is_blocked("10.0.0.1"));
        assert!(throttle.remaining("10.0.0.1").is_none());
    }

    #[test]
    fn block_and_clear() {
        let throttle = InMemoryAbuseThrottle::new();
        throttle.block("10.0.0.1", Duration::from_secs(60));
        assert!(throttle.is_blocked("10.0.0.1"));
        assert!(!throttle.is_blocked("10.0.0.2"));

        throttle.clear("10.0.0.1");
        assert!(!throttle.is_blocked("10.0.0.1"));
    }

    #[test]
    fn block_expires() {
        let throttle = InMemoryAbuseThrottle::new();
        throttle.block("10.0.0.1", Duration::from_millis(20));
        assert!(throttle.is_blocked("10.0.0.1"));
        std::thread::sleep(Duration::from_millis(40));
        assert!(!throttle.is_blocked("10.0.0.1"));
    }

    #[test]
    fn extend_only_applies_to_blocked_ip() {
        let throttle = InMemoryAbuseThrottle::new();
        assert!(!throttle.extend_if_blocked("10.0.0.1", Duration::from_secs(300)));
        assert!(!throttle.is_blocked("10.0.0.1"));
    }

    #[test]
    fn escalated_block_outlasts_base_block() {
        let policy = ThrottlePolicy::default();
        let throttle = InMemoryAbuseThrottle::new();

        throttle.block("10.0.0.1", policy.base_block);
        let first = throttle.remaining("10.0.0.1").unwrap();

        assert!(throttle.extend_if_blocked("10.0.0.1", policy.escalated_block));
        let second = throttle.remaining("10.0.0.1").unwrap();

        assert!(second > first);
        assert!(second > policy.base_block);
    }

    #[test]
    fn expired_block_is_not_extended() {
        let throttle = InMemoryAbuseThrottle::new();
        throttle.block("10.0.0.1", Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(30));

        assert!(!throttle.extend_if_blocked("10.0.0.1", Duration::from_secs(300)));
        assert!(!throttle.is_blocked("10.0.0.1"));
    }

    #[test]
    fn purge_removes_only_expired() {
        let throttle = InMemoryAbuseThrottle::new();
        throttle.block("old", Duration::from_millis(10));
        throttle.block("fresh", Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(throttle.purge_expired(), 1);
        assert_eq!(throttle.len(), 1);
        assert!(throttle.is_blocked("fresh"));
    }

    #[test]
    fn concurrent_extends_all_see_block() {
        let throttle = Arc::new(InMemoryAbuseThrottle::new());
        throttle.block("10.0.0.1", Duration::from_secs(5));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let throttle = throttle.clone();
                std::thread::spawn(move || {
                    throttle.extend_if_blocked("10.0.0.1", Duration::from_secs(300))
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert!(throttle.remaining("10.0.0.1").unwrap() > Duration::from_secs(5));
    }
}
