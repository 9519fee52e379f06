//! Shared constants for end-to-end tests
//!
//! When the seeded entries or the fake DNS contents change, update only
//! this file.

// ============================================================================
// Seeded Entries
// ============================================================================

/// Public entry, accepts pings
pub const PUBLIC_ENTRY_ID: i64 = 33661;

/// Private entry, refuses pings
pub const PRIVATE_ENTRY_ID: i64 = 33662;

/// Friends-only entry, refuses pings
pub const FRIENDS_ENTRY_ID: i64 = 33663;

/// Never inserted
pub const MISSING_ENTRY_ID: i64 = 99999;

/// Owner of every seeded entry
pub const ENTRY_OWNER: &str = "testuser";

// ============================================================================
// Fake DNS
// ============================================================================

/// Hosts the test resolver treats as existing. `127.0.0.1` lets outbound
/// deliveries reach a local mock server.
pub const RESOLVABLE_HOSTS: &[&str] = &["example.com", "example.org", "127.0.0.1"];

/// Base url used in permalinks of outbound pings
pub const TEST_BLOG_BASE_URL: &str = "http://blog.example.com";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between server readiness checks (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// HTTP request timeout for test client (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
