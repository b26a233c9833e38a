//! Media resolver
//!
//! Turns a [`MediaRequest`] plus what we know about the caller into a concrete
//! upstream URL, the request headers to send, and an advisory cache policy.
//!
//! The upstream provider has no documented contract for anonymous image
//! access; [`DriveResolver`] imitates a browser to get thumbnails out of it.
//! Expect that heuristic to break when the provider changes. It lives behind
//! the [`MediaResolver`] trait so it can be replaced without touching the
//! proxy's control flow.

mod drive;
mod tiers;

pub use drive::{BROWSER_USER_AGENT, DriveResolver};
pub use tiers::{TIERS, TargetSize, TierSpec};

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// User agent assumed when the client sent none
pub const DEFAULT_CLIENT_USER_AGENT: &str = "Mozilla/5.0 (compatible; WeddingApp/1.0)";

const MOBILE_MARKERS: [&str; 4] = ["Mobile", "Android", "iPhone", "iPad"];

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid upstream base url '{0}': {1}")]
    InvalidBaseUrl(String, String),
    #[error("media id must not be empty")]
    EmptyId,
}

/// Named resolution bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quality {
    Thumbnail,
    Preview,
    Background,
    #[default]
    Medium,
}

impl Quality {
    /// Parse a query value; anything unrecognised is `Medium`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "thumbnail" => Quality::Thumbnail,
            "preview" => Quality::Preview,
            "background" => Quality::Background,
            _ => Quality::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Thumbnail => "thumbnail",
            Quality::Preview => "preview",
            Quality::Background => "background",
            Quality::Medium => "medium",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse device classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

impl DeviceClass {
    pub fn from_user_agent(user_agent: &str) -> Self {
        if MOBILE_MARKERS.iter().any(|marker| user_agent.contains(marker)) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, DeviceClass::Mobile)
    }
}

/// One image request as received by the proxy
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct MediaRequest {
    #[builder(into)]
    pub id: String,
    #[builder(default)]
    pub quality: Quality,
    /// Advisory; the tier table decides the upstream size
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Caller metadata relevant to resolution
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub user_agent: Option<String>,
}

impl ClientContext {
    pub fn new(user_agent: Option<String>) -> Self {
        Self { user_agent }
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent
            .as_deref()
            .filter(|ua| !ua.is_empty())
            .unwrap_or(DEFAULT_CLIENT_USER_AGENT)
    }

    pub fn device_class(&self) -> DeviceClass {
        DeviceClass::from_user_agent(self.user_agent())
    }
}

/// `Cache-Control` lifetime handed back to the browser and CDN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_age: Duration,
}

impl CachePolicy {
    pub fn header_value(&self) -> String {
        let secs = self.max_age.as_secs();
        format!("public, max-age={secs}, s-maxage={secs}")
    }
}

/// Everything the proxy needs to perform the upstream fetch
#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    pub url: url::Url,
    pub headers: Vec<(String, String)>,
    pub cache_policy: CachePolicy,
    pub device: DeviceClass,
    pub quality: Quality,
    pub target: Option<TargetSize>,
}

/// Maps requests onto upstream fetches
pub trait MediaResolver: Send + Sync {
    fn resolve(
        &self,
        request: &MediaRequest,
        client: &ClientContext,
    ) -> Result<ResolvedMedia, ResolveError>;
}
