use crate::humanize::{ByteSize, HumanDuration};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Directory scanned by `GET /wedding-images`
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

/// Per-id sliding window limits in front of the upstream provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
    #[serde(default = "default_window")]
    pub window: HumanDuration,
    /// Upper bound on distinct ids tracked at once; LRU ids are evicted past it
    #[serde(default = "default_max_tracked_ids")]
    pub max_tracked_ids: usize,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: HumanDuration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window: default_window(),
            max_tracked_ids: default_max_tracked_ids(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

fn default_max_requests() -> usize {
    10
}

fn default_window() -> HumanDuration {
    HumanDuration::from_secs(60)
}

fn default_max_tracked_ids() -> usize {
    10_000
}

fn default_sweep_interval() -> HumanDuration {
    HumanDuration::from_secs(60)
}

/// Upstream storage provider settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: HumanDuration,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: ByteSize,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            max_body_bytes: default_max_body_bytes(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_base_url() -> String {
    "https://drive.google.com".to_string()
}

fn default_request_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration::from_secs(5)
}

fn default_max_body_bytes() -> ByteSize {
    ByteSize(20 * 1024 * 1024) // 20 MB
}

fn default_max_redirects() -> usize {
    5
}

/// Image proxy behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Authenticated endpoint every failure redirects to (`?fileId=<id>` is appended)
    #[serde(default = "default_fallback_path")]
    pub fallback_path: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            fallback_path: default_fallback_path(),
        }
    }
}

fn default_fallback_path() -> String {
    "/image".to_string()
}

/// Logging settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
}
