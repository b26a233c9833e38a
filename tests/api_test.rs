use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

use mediagate::api::router;
use mediagate::api::state::AppState;
use mediagate::config::Config;
use mediagate::limiter::{LimiterSettings, ManualClock, RateLimiter};
use mediagate::resolver::DriveResolver;
use mediagate::upstream::{MockFetcher, MockResponse};

const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";
const DESKTOP: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

struct TestApp {
    router: Router,
    fetcher: Arc<MockFetcher>,
    clock: Arc<ManualClock>,
    limiter: Arc<RateLimiter>,
}

/// Builds a router over a mock upstream and a manually driven clock
fn build_test_app(fetcher: MockFetcher, static_dir: &Path) -> TestApp {
    let mut config = Config::default();
    config.server.static_dir = static_dir.to_path_buf();

    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let limiter = RateLimiter::with_clock(LimiterSettings::from(&config.rate_limit), clock.clone());
    let resolver = DriveResolver::new(&config.upstream.base_url).expect("default base url");
    let fetcher = Arc::new(fetcher);

    let state = AppState::with_limiter(config, limiter, Arc::new(resolver), fetcher.clone());

    let limiter = state.limiter.clone();

    TestApp {
        router: router(state),
        fetcher,
        clock,
        limiter,
    }
}

fn jpeg_app(static_dir: &Path) -> TestApp {
    build_test_app(MockFetcher::image("image/jpeg", &b"\xff\xd8\xff\xe0jpeg"[..]), static_dir)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn header<'a>(response: &'a axum::response::Response, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .unwrap()
}

#[tokio::test]
async fn test_proxy_serves_image_with_cache_headers() {
    let dir = TempDir::new().unwrap();
    let app = jpeg_app(dir.path());

    let request = Request::builder()
        .uri("/image-proxy?id=abc123&quality=thumbnail&width=400&height=400")
        .header(header::USER_AGENT, DESKTOP)
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), "image/jpeg");
    assert_eq!(
        header(&response, "cache-control"),
        "public, max-age=86400, s-maxage=86400"
    );
    assert_eq!(header(&response, "access-control-allow-origin"), "*");
    assert_eq!(header(&response, "access-control-allow-methods"), "GET");
    assert_eq!(header(&response, "vary"), "Accept-Encoding, User-Agent");
    assert_eq!(header(&response, "x-content-type-options"), "nosniff");
    assert_eq!(header(&response, "x-image-quality"), "thumbnail");
    assert_eq!(header(&response, "x-mobile-optimized"), "false");
    assert_eq!(body_bytes(response).await, b"\xff\xd8\xff\xe0jpeg");

    let url = app.fetcher.last_url().unwrap();
    assert_eq!(
        url.as_str(),
        "https://drive.google.com/thumbnail?id=abc123&sz=w400-h400"
    );
}

#[tokio::test]
async fn test_proxy_uses_mobile_dimensions() {
    let dir = TempDir::new().unwrap();
    let app = jpeg_app(dir.path());

    let request = Request::builder()
        .uri("/image-proxy?id=abc123&quality=background")
        .header(header::USER_AGENT, IPHONE)
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-mobile-optimized"), "true");
    assert_eq!(
        header(&response, "cache-control"),
        "public, max-age=43200, s-maxage=43200"
    );
    assert_eq!(
        app.fetcher.last_url().unwrap().as_str(),
        "https://drive.google.com/thumbnail?id=abc123&sz=w800-h600"
    );
}

#[tokio::test]
async fn test_proxy_unknown_quality_is_medium() {
    let dir = TempDir::new().unwrap();
    let app = jpeg_app(dir.path());

    let response = app
        .router
        .oneshot(get("/image-proxy?id=abc123&quality=huge"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-image-quality"), "medium");
    assert_eq!(header(&response, "cache-control"), "public, max-age=3600, s-maxage=3600");
    assert_eq!(
        app.fetcher.last_url().unwrap().as_str(),
        "https://drive.google.com/uc?export=view&id=abc123"
    );
}

#[tokio::test]
async fn test_proxy_missing_id_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = jpeg_app(dir.path());

    let response = app.router.clone().oneshot(get("/image-proxy")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Image ID is required", "code": "MISSING_ID" })
    );

    // Whitespace-only ids count as missing
    let response = app.router.oneshot(get("/image-proxy?id=%20%20")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.fetcher.calls(), 0);
}

#[tokio::test]
async fn test_proxy_rejects_post() {
    let dir = TempDir::new().unwrap();
    let app = jpeg_app(dir.path());

    let request = Request::builder()
        .method("POST")
        .uri("/image-proxy?id=abc123")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(header(&response, "allow"), "GET");
    let body = body_json(response).await;
    assert_eq!(body["code"], "METHOD_NOT_ALLOWED");
    assert!(body["error"].is_string());
    assert_eq!(app.fetcher.calls(), 0);
}

#[tokio::test]
async fn test_head_is_rejected_before_limiter_and_upstream() {
    let dir = TempDir::new().unwrap();
    let app = jpeg_app(dir.path());

    for _ in 0..11 {
        let request = Request::builder()
            .method("HEAD")
            .uri("/image-proxy?id=abc123")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(header(&response, "allow"), "GET");
    }
    assert_eq!(app.fetcher.calls(), 0);
    assert_eq!(app.limiter.in_window("abc123"), 0);

    // A following GET still has the whole window available
    let response = app
        .router
        .clone()
        .oneshot(get("/image-proxy?id=abc123"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.limiter.in_window("abc123"), 1);

    let request = Request::builder()
        .method("HEAD")
        .uri("/wedding-images")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_proxy_upstream_error_redirects_to_fallback() {
    let dir = TempDir::new().unwrap();
    let app = build_test_app(MockFetcher::status(403), dir.path());

    let response = app
        .router
        .oneshot(get("/image-proxy?id=abc123&quality=preview"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(header(&response, "location"), "/image?fileId=abc123");
    assert_eq!(header(&response, "x-fallback-reason"), "upstream-status-403");
    assert_eq!(app.fetcher.calls(), 1);
}

#[tokio::test]
async fn test_proxy_timeout_redirects_to_fallback() {
    let dir = TempDir::new().unwrap();
    let app = build_test_app(MockFetcher::new(MockResponse::Timeout), dir.path());

    let response = app.router.oneshot(get("/image-proxy?id=abc123")).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(header(&response, "location"), "/image?fileId=abc123");
    assert_eq!(app.fetcher.calls(), 1);
}

#[tokio::test]
async fn test_proxy_non_image_redirects_to_fallback() {
    let dir = TempDir::new().unwrap();
    let app = build_test_app(
        MockFetcher::image("text/html; charset=utf-8", &b"<html>sign in</html>"[..]),
        dir.path(),
    );

    let response = app.router.oneshot(get("/image-proxy?id=abc123")).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(header(&response, "location"), "/image?fileId=abc123");
    assert_eq!(header(&response, "x-fallback-reason"), "not-an-image");
}

#[tokio::test]
async fn test_proxy_fallback_location_encodes_id() {
    let dir = TempDir::new().unwrap();
    let app = build_test_app(MockFetcher::status(404), dir.path());

    let response = app
        .router
        .oneshot(get("/image-proxy?id=a%26b%20c"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(header(&response, "location"), "/image?fileId=a%26b+c");
}

#[tokio::test]
async fn test_proxy_rate_limit_per_id() {
    let dir = TempDir::new().unwrap();
    let app = jpeg_app(dir.path());

    for _ in 0..10 {
        let response = app
            .router
            .clone()
            .oneshot(get("/image-proxy?id=hot"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // 11th request in the window never reaches upstream
    let response = app
        .router
        .clone()
        .oneshot(get("/image-proxy?id=hot"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(header(&response, "location"), "/image?fileId=hot");
    assert_eq!(header(&response, "x-fallback-reason"), "rate-limited");
    assert_eq!(app.fetcher.calls(), 10);

    // Other ids are unaffected
    let response = app
        .router
        .clone()
        .oneshot(get("/image-proxy?id=cold"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Window slides past the first requests
    app.clock.advance(Duration::from_secs(60));
    let response = app.router.oneshot(get("/image-proxy?id=hot")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.fetcher.calls(), 12);
}

#[tokio::test]
async fn test_wedding_images_lists_sorted_matches() {
    let dir = TempDir::new().unwrap();
    for name in [
        "wedding-b.png",
        "wedding-a.JPG",
        "wedding-c.webp",
        "wedding-notes.txt",
        "couple.jpg",
    ] {
        std::fs::write(dir.path().join(name), b"x").unwrap();
    }
    let app = jpeg_app(dir.path());

    let response = app.router.oneshot(get("/wedding-images")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!(["/wedding-a.JPG", "/wedding-b.png", "/wedding-c.webp"])
    );
}

#[tokio::test]
async fn test_wedding_images_defaults_when_none_match() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("logo.svg"), b"x").unwrap();
    let app = jpeg_app(dir.path());

    let response = app.router.oneshot(get("/wedding-images")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!(["/wedding-couple.jpeg", "/wedding-souple-2.jpg"])
    );
}

#[tokio::test]
async fn test_wedding_images_unreadable_dir() {
    let dir = TempDir::new().unwrap();
    let app = jpeg_app(&dir.path().join("missing"));

    let response = app.router.oneshot(get("/wedding-images")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({
            "error": "Failed to load images",
            "fallback": ["/wedding-couple.jpeg", "/wedding-souple-2.jpg"]
        })
    );
}

#[tokio::test]
async fn test_metrics_track_outcomes() {
    let dir = TempDir::new().unwrap();
    let app = build_test_app(MockFetcher::status(500), dir.path());

    let response = app
        .router
        .clone()
        .oneshot(get("/image-proxy?id=abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let response = app.router.clone().oneshot(get("/image-proxy")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.router.oneshot(get("/operators/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "images_proxied": 0,
            "rate_limited": 0,
            "fallbacks": 1,
            "requests_rejected": 1
        })
    );
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let app = jpeg_app(dir.path());

    let response = app.router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ok");
}
