//! End-to-end aggregation scenarios against mock feeds.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use calmerge_core::Source;
use calmerge_providers::{FetcherConfig, HttpFeedFetcher};
use calmerge_server::{AppConfig, AppState, Refresher, SnapshotStore, event_lines, router};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED_A: &str = "BEGIN:VCALENDAR\r\n\
                      VERSION:2.0\r\n\
                      PRODID:-//Example//A//EN\r\n\
                      BEGIN:VTIMEZONE\r\n\
                      TZID:Europe/Paris\r\n\
                      END:VTIMEZONE\r\n\
                      BEGIN:VEVENT\r\n\
                      UID:a-1@example.com\r\n\
                      DTSTART:20250310T080000Z\r\n\
                      DTEND:20250310T090000Z\r\n\
                      SUMMARY:Planning\r\n\
                      END:VEVENT\r\n\
                      BEGIN:VEVENT\r\n\
                      UID:a-2@example.com\r\n\
                      DTSTART;VALUE=DATE:20250309\r\n\
                      SUMMARY:Sunday\r\n\
                      END:VEVENT\r\n\
                      END:VCALENDAR\r\n";

const FEED_DISABLED: &str = "BEGIN:VCALENDAR\r\n\
                             VERSION:2.0\r\n\
                             BEGIN:VEVENT\r\n\
                             UID:hidden@example.com\r\n\
                             DTSTART:20250310T080000Z\r\n\
                             END:VEVENT\r\n\
                             END:VCALENDAR\r\n";

/// Mock server with one healthy feed, one slow feed, one HTML login page and
/// one feed belonging to a disabled source.
async fn feeds() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/a.ics"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_A))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b.ics"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(FEED_A)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/private.ics"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>Sign in to continue</body></html>"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/disabled.ics"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_DISABLED))
        .expect(0)
        .mount(&server)
        .await;

    server
}

fn config(server: &MockServer) -> AppConfig {
    let url = |p: &str| format!("{}{}", server.uri(), p);
    AppConfig {
        sources: vec![
            Source::new("a", "Source A", url("/a.ics")).with_color("#ef4444"),
            Source::new("b", "Source B", url("/b.ics")),
            Source::new("private", "Private", url("/private.ics")),
            Source::new("disabled", "Disabled", url("/disabled.ics")).with_enabled(false),
        ],
        ..AppConfig::default()
    }
}

async fn app(server: &MockServer) -> (Router, Arc<Refresher>) {
    let config = Arc::new(config(server));
    let fetcher = HttpFeedFetcher::new(
        FetcherConfig::new().with_timeout(Duration::from_millis(300)),
    )
    .unwrap();
    let refresher = Arc::new(Refresher::new(
        config.sources.clone(),
        Arc::new(fetcher),
        Arc::new(SnapshotStore::new()),
    ));
    refresher.refresh_all().await;

    let app = router(AppState::new(config, refresher.clone(), 3000));
    (app, refresher)
}

async fn send(app: &Router, method: &str, uri: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn json(response: Response) -> serde_json::Value {
    serde_json::from_str(&text(response).await).unwrap()
}

fn event_ids(body: &serde_json::Value) -> Vec<String> {
    body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn timed_out_source_contributes_nothing() {
    let server = feeds().await;
    let (app, _) = app(&server).await;

    let body = json(send(&app, "GET", "/api/events").await).await;
    assert_eq!(event_ids(&body), vec!["a-2@example.com", "a-1@example.com"]);
    assert!(body["events"]
        .as_array()
        .unwrap()
        .iter()
        .all(|e| e["sourceId"] == "a" && e["color"] == "#ef4444"));

    let response = send(&app, "GET", "/ics/b.ics").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let combined = text(send(&app, "GET", "/ics/all.ics").await).await;
    assert_eq!(combined.matches("BEGIN:VEVENT").count(), 2);
    assert!(combined.contains("UID:a-1@example.com"));
    assert!(!combined.contains("VTIMEZONE"));
}

#[tokio::test]
async fn html_feed_is_a_failure() {
    let server = feeds().await;
    let (app, refresher) = app(&server).await;

    let snapshot = refresher.store().snapshot().await;
    let entry = snapshot.entry("private").unwrap();
    assert!(entry.events.is_empty());
    assert!(entry.raw_payload.is_none());

    let response = send(&app, "GET", "/ics/private.ics").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(text(response).await, "Calendar not found");

    let body = json(send(&app, "GET", "/api/events?sources=private").await).await;
    assert!(event_ids(&body).is_empty());
}

#[tokio::test]
async fn repeated_refresh_keeps_content_and_advances_timestamp() {
    let server = feeds().await;
    let (app, _) = app(&server).await;

    let first = json(send(&app, "POST", "/api/refresh").await).await;
    let events_first = json(send(&app, "GET", "/api/events").await).await;
    let second = json(send(&app, "POST", "/api/refresh").await).await;
    let events_second = json(send(&app, "GET", "/api/events").await).await;

    assert_eq!(first["success"], true);
    assert_eq!(second["success"], true);
    assert_eq!(event_ids(&events_first), event_ids(&events_second));

    let t1: chrono::DateTime<chrono::Utc> =
        first["lastRefresh"].as_str().unwrap().parse().unwrap();
    let t2: chrono::DateTime<chrono::Utc> =
        second["lastRefresh"].as_str().unwrap().parse().unwrap();
    assert!(t2 > t1);
}

#[tokio::test]
async fn disabled_source_is_never_fetched() {
    let server = feeds().await;
    let (app, refresher) = app(&server).await;

    assert!(refresher.store().snapshot().await.entry("disabled").is_none());

    let sources = json(send(&app, "GET", "/api/sources").await).await;
    let disabled = sources["sources"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["id"] == "disabled")
        .unwrap();
    assert_eq!(disabled["enabled"], false);

    let events = json(send(&app, "GET", "/api/events?sources=disabled").await).await;
    assert!(event_ids(&events).is_empty());

    let combined = text(send(&app, "GET", "/ics/all.ics").await).await;
    assert!(!combined.contains("hidden@example.com"));

    assert_eq!(
        send(&app, "GET", "/ics/disabled.ics").await.status(),
        StatusCode::NOT_FOUND
    );

    // Mock expectations (zero calls to the disabled feed) are checked on drop.
    drop(server);
}

#[tokio::test]
async fn combined_document_keeps_blocks_verbatim_and_is_stable() {
    let server = feeds().await;
    let (app, _) = app(&server).await;

    let first = text(send(&app, "GET", "/ics/all.ics").await).await;
    let second = text(send(&app, "GET", "/ics/all.ics").await).await;
    assert_eq!(first, second);

    let expected = event_lines(FEED_A).join("\r\n");
    assert!(first.contains(&expected));
    assert!(first.starts_with(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Calendrier ICS Aggregator//FR\r\n"
    ));
    assert!(first.ends_with("END:VEVENT\r\nEND:VCALENDAR\r\n"));
}

#[tokio::test]
async fn single_feed_is_proxied_unchanged() {
    let server = feeds().await;
    let (app, _) = app(&server).await;

    let response = send(&app, "GET", "/ics/a.ics").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-disposition"],
        "inline; filename=\"Source_A.ics\""
    );
    assert_eq!(text(response).await, FEED_A);
}
