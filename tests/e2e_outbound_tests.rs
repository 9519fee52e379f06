//! End-to-end tests for outbound notifications
//!
//! A wiremock server plays the remote blog: it serves the linked page and
//! accepts the ping on its discovered endpoint.

mod common;

use backlink_server::domain_validator::{DomainValidator, StaticResolver};
use backlink_server::outbound::{OutboundConfig, OutboundNotifier, PingContent};
use common::{TestClient, TestServer, ENTRY_OWNER, RESOLVABLE_HOSTS, TEST_BLOG_BASE_URL};
use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ACK: &str = r#"<?xml version="1.0" encoding="utf-8"?><response><error>0</error></response>"#;
const NACK: &str = r#"<?xml version="1.0" encoding="utf-8"?><response><error>1</error><message>Nope</message></response>"#;

fn notifier() -> OutboundNotifier {
    OutboundNotifier::new(
        OutboundConfig {
            base_url: TEST_BLOG_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(2),
            ..OutboundConfig::default()
        },
        DomainValidator::new(Arc::new(StaticResolver::new(
            RESOLVABLE_HOSTS.iter().copied(),
        ))),
    )
    .unwrap()
}

fn ping_content(body: &str) -> PingContent {
    PingContent {
        entry_id: 7,
        username: ENTRY_OWNER.to_string(),
        blog_name: "Test Blog".to_string(),
        subject: "Linking out".to_string(),
        body: body.to_string(),
    }
}

async fn serve_page(remote: &MockServer, page_path: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(remote)
        .await;
}

#[tokio::test]
async fn test_delivers_to_link_tag_endpoint() {
    let remote = MockServer::start().await;
    let endpoint = format!("{}/ping", remote.uri());
    serve_page(
        &remote,
        "/post",
        format!(
            r#"<html><head><link rel="trackback" type="application/x-www-form-urlencoded" href="{}"></head></html>"#,
            endpoint
        ),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/ping"))
        .and(header_regex("content-type", "^application/x-www-form-urlencoded"))
        .and(body_string_contains("title=Linking%20out"))
        .and(body_string_contains(
            "url=http%3A%2F%2Fblog.example.com%2Fusers%2Ftestuser%2Fentry%2F7",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(ACK))
        .expect(1)
        .mount(&remote)
        .await;

    let delivered = notifier()
        .notify(&format!("{}/post", remote.uri()), &ping_content("Hi"))
        .await;

    assert!(delivered);
}

#[tokio::test]
async fn test_rdf_marker_takes_precedence() {
    let remote = MockServer::start().await;
    serve_page(
        &remote,
        "/post",
        format!(
            r#"<html><head><link rel="trackback" type="application/x-www-form-urlencoded" href="{0}/link-ping"></head>
<!-- <rdf:RDF><rdf:Description trackback:ping="{0}/rdf-ping" /></rdf:RDF> --></html>"#,
            remote.uri()
        ),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/rdf-ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ACK))
        .expect(1)
        .mount(&remote)
        .await;
    Mock::given(method("POST"))
        .and(path("/link-ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ACK))
        .expect(0)
        .mount(&remote)
        .await;

    assert!(
        notifier()
            .notify(&format!("{}/post", remote.uri()), &ping_content("Hi"))
            .await
    );
}

#[tokio::test]
async fn test_unacknowledged_ping_counts_as_failure() {
    let remote = MockServer::start().await;
    serve_page(
        &remote,
        "/post",
        format!(
            r#"<rdf:Description trackback:ping="{}/ping" />"#,
            remote.uri()
        ),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NACK))
        .mount(&remote)
        .await;

    assert!(
        !notifier()
            .notify(&format!("{}/post", remote.uri()), &ping_content("Hi"))
            .await
    );
}

#[tokio::test]
async fn test_page_without_endpoint_is_skipped() {
    let remote = MockServer::start().await;
    serve_page(&remote, "/post", "<html><body>No trackbacks here</body></html>".to_string()).await;

    assert!(
        !notifier()
            .notify(&format!("{}/post", remote.uri()), &ping_content("Hi"))
            .await
    );
}

#[tokio::test]
async fn test_notify_for_entry_covers_explicit_and_embedded_links() {
    let remote = MockServer::start().await;
    for page in ["/explicit", "/embedded"] {
        serve_page(
            &remote,
            page,
            format!(
                r#"<rdf:Description trackback:ping="{}/ping{}" />"#,
                remote.uri(),
                page
            ),
        )
        .await;
    }
    Mock::given(method("POST"))
        .and(path("/ping/explicit"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ACK))
        .expect(1)
        .mount(&remote)
        .await;
    Mock::given(method("POST"))
        .and(path("/ping/embedded"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ACK))
        .expect(1)
        .mount(&remote)
        .await;

    let explicit = format!("{}/explicit", remote.uri());
    let body = format!(
        "Read {} and {}/embedded, plus http://nowhere.invalid/x",
        explicit,
        remote.uri()
    );

    let delivered = notifier()
        .notify_for_entry(Some(&explicit), &ping_content(&body))
        .await;

    assert_eq!(delivered, 2);
}

#[tokio::test]
async fn test_publish_delivers_in_background() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone(), "203.0.113.30");

    let remote = MockServer::start().await;
    serve_page(
        &remote,
        "/post",
        format!(
            r#"<link rel="trackback" type="application/x-www-form-urlencoded" href="{}/ping">"#,
            remote.uri()
        ),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ACK))
        .mount(&remote)
        .await;

    let response = client
        .publish_entry(&json!({
            "username": ENTRY_OWNER,
            "blog_name": "Test Blog",
            "subject": "Hello remote",
            "body": format!("I liked {}/post", remote.uri()),
            "security": "public",
            "trackback_url": null,
        }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let start = std::time::Instant::now();
    loop {
        let pings = remote
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == "/ping")
            .count();
        if pings == 1 {
            break;
        }
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "Ping was never delivered"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn test_unreachable_target_never_fails_publish() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone(), "203.0.113.31");

    let response = client
        .publish_entry(&json!({
            "username": ENTRY_OWNER,
            "blog_name": "Test Blog",
            "subject": "Dead links",
            "body": "See http://nowhere.invalid/post and http://127.0.0.1:1/closed",
            "security": "public",
            "trackback_url": "http://also-nowhere.invalid/ping",
        }))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let entry: serde_json::Value = response.json().await.unwrap();
    let id = entry["id"].as_i64().unwrap();
    assert!(server.entry_store.get_entry(id).unwrap().is_some());
}
