//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all backlink-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

/// HTTP test client acting as a single remote caller
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Sent as `X-Forwarded-For`, the server's notion of who is calling
    pub client_ip: String,
}

impl TestClient {
    pub fn new(base_url: String, client_ip: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            client_ip: client_ip.to_string(),
        }
    }

    // ========================================================================
    // Trackback Protocol Endpoints
    // ========================================================================

    /// POST /trackback with the entry id among the form fields
    pub async fn ping(&self, form: &[(&str, &str)]) -> Response {
        self.client
            .post(format!("{}/trackback", self.base_url))
            .header("X-Forwarded-For", &self.client_ip)
            .form(form)
            .send()
            .await
            .expect("Ping request failed")
    }

    /// POST /trackback/{entry_id}
    pub async fn ping_entry(&self, entry_id: i64, form: &[(&str, &str)]) -> Response {
        self.client
            .post(format!("{}/trackback/{}", self.base_url, entry_id))
            .header("X-Forwarded-For", &self.client_ip)
            .form(form)
            .send()
            .await
            .expect("Ping request failed")
    }

    /// Standard trackback ping for `entry_id` from `url`
    pub async fn trackback(&self, entry_id: i64, url: &str) -> Response {
        let entry_id = entry_id.to_string();
        self.ping(&[
            ("entryID", entry_id.as_str()),
            ("url", url),
            ("title", "My Title"),
            ("excerpt", "Hello"),
            ("blog_name", "Remote Blog"),
        ])
        .await
    }

    // ========================================================================
    // Record Endpoints
    // ========================================================================

    /// GET /v1/entry/{entry_id}/trackbacks
    pub async fn get_entry_trackbacks(&self, entry_id: i64) -> Response {
        self.client
            .get(format!("{}/v1/entry/{}/trackbacks", self.base_url, entry_id))
            .send()
            .await
            .expect("Get entry trackbacks request failed")
    }

    /// GET /v1/trackback/{id}
    pub async fn get_trackback(&self, id: i64) -> Response {
        self.client
            .get(format!("{}/v1/trackback/{}", self.base_url, id))
            .send()
            .await
            .expect("Get trackback request failed")
    }

    /// POST /v1/entry
    pub async fn publish_entry(&self, entry: &Value) -> Response {
        self.client
            .post(format!("{}/v1/entry", self.base_url))
            .json(entry)
            .send()
            .await
            .expect("Publish entry request failed")
    }

    // ========================================================================
    // Server Endpoints
    // ========================================================================

    /// GET /
    pub async fn home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }
}
