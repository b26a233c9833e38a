//! HTTP client for the upstream storage provider

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::UpstreamConfig;

/// Content type assumed when upstream omits the header
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Upstream timed out")]
    Timeout,

    #[error("Upstream returned HTTP {0}")]
    Status(u16),

    #[error("Too many redirects")]
    TooManyRedirects,

    #[error("Upstream body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Successful upstream response
#[derive(Debug, Clone)]
pub struct UpstreamImage {
    pub content_type: String,
    pub bytes: Bytes,
}

/// Performs the single upstream GET for a resolved media URL
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    async fn fetch(&self, url: &Url, headers: &[(String, String)]) -> Result<UpstreamImage>;
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            max_body_bytes: 20 * 1024 * 1024,
            max_redirects: 5,
        }
    }
}

impl From<&UpstreamConfig> for HttpConfig {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout.as_duration(),
            request_timeout: config.request_timeout.as_duration(),
            max_body_bytes: config.max_body_bytes.as_usize(),
            max_redirects: config.max_redirects,
        }
    }
}

/// reqwest-backed fetcher; no retries, the proxy falls back instead
pub struct HttpFetcher {
    client: Client,
    config: HttpConfig,
}

impl HttpFetcher {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl UpstreamFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, headers: &[(String, String)]) -> Result<UpstreamImage> {
        debug!(%url, "Fetching from upstream");

        let mut request = self.client.get(url.clone());
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let mut response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let limit = self.config.max_body_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(FetchError::TooLarge { limit });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(map_reqwest_error)? {
            if body.len() + chunk.len() > limit {
                return Err(FetchError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        debug!(%url, size = body.len(), %content_type, "Upstream fetch completed");

        Ok(UpstreamImage {
            content_type,
            bytes: body.freeze(),
        })
    }
}

/// Scripted upstream for development and tests
#[derive(Debug, Clone)]
pub enum MockResponse {
    Image { content_type: String, bytes: Bytes },
    Status(u16),
    Timeout,
}

/// Fetcher replaying one scripted response and counting calls
#[derive(Debug)]
pub struct MockFetcher {
    response: Mutex<MockResponse>,
    calls: AtomicUsize,
    last_url: Mutex<Option<Url>>,
}

impl MockFetcher {
    pub fn new(response: MockResponse) -> Self {
        Self {
            response: Mutex::new(response),
            calls: AtomicUsize::new(0),
            last_url: Mutex::new(None),
        }
    }

    pub fn image(content_type: &str, bytes: impl Into<Bytes>) -> Self {
        Self::new(MockResponse::Image {
            content_type: content_type.to_string(),
            bytes: bytes.into(),
        })
    }

    pub fn status(code: u16) -> Self {
        Self::new(MockResponse::Status(code))
    }

    pub fn set_response(&self, response: MockResponse) {
        *self.response.lock() = response;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_url(&self) -> Option<Url> {
        self.last_url.lock().clone()
    }
}

#[async_trait]
impl UpstreamFetcher for MockFetcher {
    async fn fetch(&self, url: &Url, _headers: &[(String, String)]) -> Result<UpstreamImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_url.lock() = Some(url.clone());

        let response = self.response.lock().clone();
        match response {
            MockResponse::Image { content_type, bytes } => Ok(UpstreamImage { content_type, bytes }),
            MockResponse::Status(code) => Err(FetchError::Status(code)),
            MockResponse::Timeout => Err(FetchError::Timeout),
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_redirect() {
        FetchError::TooManyRedirects
    } else {
        FetchError::RequestFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
    use tokio::net::TcpListener;

    async fn spawn_upstream(router: Router) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.max_body_bytes, 20 * 1024 * 1024);
    }

    #[test]
    fn test_http_config_from_upstream_config() {
        let config = HttpConfig::from(&UpstreamConfig::default());
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.max_redirects, 5);
    }

    #[tokio::test]
    async fn test_fetch_returns_body_and_content_type() {
        let base = spawn_upstream(Router::new().route(
            "/thumbnail",
            get(|| async { ([("content-type", "image/png")], vec![0x89u8, b'P', b'N', b'G']) }),
        ))
        .await;

        let fetcher = HttpFetcher::new(HttpConfig::default()).unwrap();
        let image = fetcher
            .fetch(&base.join("thumbnail").unwrap(), &[])
            .await
            .unwrap();

        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.bytes.as_ref(), &[0x89u8, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_fetch_maps_error_status() {
        let base = spawn_upstream(Router::new().route(
            "/thumbnail",
            get(|| async { StatusCode::FORBIDDEN.into_response() }),
        ))
        .await;

        let fetcher = HttpFetcher::new(HttpConfig::default()).unwrap();
        let result = fetcher.fetch(&base.join("thumbnail").unwrap(), &[]).await;
        assert!(matches!(result, Err(FetchError::Status(403))));
    }

    #[tokio::test]
    async fn test_fetch_forwards_headers() {
        let base = spawn_upstream(Router::new().route(
            "/echo",
            get(|headers: axum::http::HeaderMap| async move {
                let referer = headers
                    .get("referer")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                ([("content-type", "image/gif")], referer)
            }),
        ))
        .await;

        let fetcher = HttpFetcher::new(HttpConfig::default()).unwrap();
        let headers = vec![("Referer".to_string(), "https://drive.google.com/".to_string())];
        let image = fetcher
            .fetch(&base.join("echo").unwrap(), &headers)
            .await
            .unwrap();
        assert_eq!(image.bytes.as_ref(), b"https://drive.google.com/");
    }

    #[tokio::test]
    async fn test_fetch_enforces_body_limit() {
        let base = spawn_upstream(Router::new().route(
            "/big",
            get(|| async { ([("content-type", "image/jpeg")], vec![0u8; 4096]) }),
        ))
        .await;

        let fetcher = HttpFetcher::new(HttpConfig {
            max_body_bytes: 1024,
            ..HttpConfig::default()
        })
        .unwrap();
        let result = fetcher.fetch(&base.join("big").unwrap(), &[]).await;
        assert!(matches!(result, Err(FetchError::TooLarge { limit: 1024 })));
    }

    #[tokio::test]
    async fn test_mock_fetcher_counts_calls() {
        let mock = MockFetcher::status(403);
        let url = Url::parse("https://drive.google.com/thumbnail?id=x").unwrap();

        assert!(matches!(mock.fetch(&url, &[]).await, Err(FetchError::Status(403))));
        mock.set_response(MockResponse::Timeout);
        assert!(matches!(mock.fetch(&url, &[]).await, Err(FetchError::Timeout)));

        assert_eq!(mock.calls(), 2);
        assert_eq!(mock.last_url(), Some(url));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let base = spawn_upstream(Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        ))
        .await;

        let fetcher = HttpFetcher::new(HttpConfig {
            request_timeout: Duration::from_millis(200),
            ..HttpConfig::default()
        })
        .unwrap();
        let result = fetcher.fetch(&base.join("slow").unwrap(), &[]).await;
        assert!(matches!(result, Err(FetchError::Timeout)));
    }
}
