//! Image proxy core
//!
//! One request runs strictly in this order: rate limit gate, resolve,
//! single upstream fetch, content type check. Every failure past request
//! validation becomes a redirect to the authenticated fallback endpoint;
//! the browser never sees a hard error from this path.

use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, info, warn};

use crate::limiter::RateLimiter;
use crate::observability::Metrics;
use crate::resolver::{
    CachePolicy, ClientContext, DeviceClass, MediaRequest, MediaResolver, Quality, ResolveError,
};
use crate::upstream::{FetchError, UpstreamFetcher};

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("resolve failed: {0}")]
    Resolve(#[from] ResolveError),
    #[error("upstream fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("upstream returned non-image content type '{0}'")]
    NotAnImage(String),
    #[error("proxy task aborted: {0}")]
    Aborted(String),
}

/// Image bytes ready to forward
#[derive(Debug, Clone)]
pub struct ProxiedImage {
    pub bytes: Bytes,
    pub content_type: String,
    pub cache_policy: CachePolicy,
    pub device: DeviceClass,
    pub quality: Quality,
}

/// Why a request was sent to the fallback endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    RateLimited,
    UpstreamStatus(u16),
    UpstreamUnavailable,
    NotAnImage,
    Internal,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::RateLimited => f.write_str("rate-limited"),
            FallbackReason::UpstreamStatus(code) => write!(f, "upstream-status-{code}"),
            FallbackReason::UpstreamUnavailable => f.write_str("upstream-unavailable"),
            FallbackReason::NotAnImage => f.write_str("not-an-image"),
            FallbackReason::Internal => f.write_str("internal"),
        }
    }
}

impl From<&ProxyError> for FallbackReason {
    fn from(error: &ProxyError) -> Self {
        match error {
            ProxyError::Fetch(FetchError::Status(code)) => FallbackReason::UpstreamStatus(*code),
            ProxyError::Fetch(_) => FallbackReason::UpstreamUnavailable,
            ProxyError::NotAnImage(_) => FallbackReason::NotAnImage,
            ProxyError::Resolve(_) | ProxyError::Aborted(_) => FallbackReason::Internal,
        }
    }
}

/// Redirect target for a failed proxy attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackRedirect {
    pub location: String,
    pub reason: FallbackReason,
}

/// Exactly one of these is produced per request
#[derive(Debug, Clone)]
pub enum ProxyOutcome {
    Image(ProxiedImage),
    Redirect(FallbackRedirect),
}

impl ProxyOutcome {
    pub fn is_redirect(&self) -> bool {
        matches!(self, ProxyOutcome::Redirect(_))
    }
}

/// Composes the limiter, resolver and fetcher into the proxy pipeline
pub struct ImageProxy {
    limiter: Arc<RateLimiter>,
    resolver: Arc<dyn MediaResolver>,
    fetcher: Arc<dyn UpstreamFetcher>,
    metrics: Arc<Metrics>,
    fallback_path: String,
}

impl ImageProxy {
    pub fn new(
        limiter: Arc<RateLimiter>,
        resolver: Arc<dyn MediaResolver>,
        fetcher: Arc<dyn UpstreamFetcher>,
        metrics: Arc<Metrics>,
        fallback_path: impl Into<String>,
    ) -> Self {
        Self {
            limiter,
            resolver,
            fetcher,
            metrics,
            fallback_path: fallback_path.into(),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// `{fallback_path}?fileId={id}` with the id form-encoded
    pub fn fallback_location(&self, id: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
        format!("{}?fileId={}", self.fallback_path, encoded)
    }

    fn redirect(&self, id: &str, reason: FallbackReason) -> ProxyOutcome {
        ProxyOutcome::Redirect(FallbackRedirect {
            location: self.fallback_location(id),
            reason,
        })
    }

    /// Run one validated request through the pipeline
    pub async fn handle(&self, request: &MediaRequest, client: &ClientContext) -> ProxyOutcome {
        if !self.limiter.check_and_record(&request.id) {
            info!(id = %request.id, "Rate limited, redirecting to fallback");
            self.metrics.rate_limited();
            return self.redirect(&request.id, FallbackReason::RateLimited);
        }

        match self.fetch_image(request, client).await {
            Ok(image) => {
                info!(
                    id = %request.id,
                    quality = %image.quality,
                    mobile = image.device.is_mobile(),
                    size = image.bytes.len(),
                    "Proxied image"
                );
                self.metrics.image_proxied();
                ProxyOutcome::Image(image)
            }
            Err(error) => self.fail(&request.id, &error),
        }
    }

    /// Like [`handle`](Self::handle), but runs on its own task so a panic
    /// anywhere in the pipeline still ends in the fallback redirect.
    pub async fn handle_guarded(
        self: &Arc<Self>,
        request: MediaRequest,
        client: ClientContext,
    ) -> ProxyOutcome {
        let id = request.id.clone();
        let proxy = Arc::clone(self);
        let task = tokio::spawn(
            async move { proxy.handle(&request, &client).await }.in_current_span(),
        );

        match task.await {
            Ok(outcome) => outcome,
            Err(join_error) => self.fail(&id, &ProxyError::Aborted(join_error.to_string())),
        }
    }

    fn fail(&self, id: &str, error: &ProxyError) -> ProxyOutcome {
        let reason = FallbackReason::from(error);
        warn!(id, %reason, error = %error, "Proxy failed, redirecting to fallback");
        self.metrics.fallback();
        self.redirect(id, reason)
    }

    async fn fetch_image(
        &self,
        request: &MediaRequest,
        client: &ClientContext,
    ) -> Result<ProxiedImage, ProxyError> {
        let resolved = self.resolver.resolve(request, client)?;
        info!(
            id = %request.id,
            quality = %resolved.quality,
            width = ?request.width,
            height = ?request.height,
            url = %resolved.url,
            "Fetching image from upstream"
        );

        let upstream = self.fetcher.fetch(&resolved.url, &resolved.headers).await?;

        if !is_image_content_type(&upstream.content_type) {
            return Err(ProxyError::NotAnImage(upstream.content_type));
        }

        Ok(ProxiedImage {
            bytes: upstream.bytes,
            content_type: upstream.content_type,
            cache_policy: resolved.cache_policy,
            device: resolved.device,
            quality: resolved.quality,
        })
    }
}

/// True when the top-level media type is `image`
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .parse::<mime::Mime>()
        .map(|media_type| media_type.type_() == mime::IMAGE)
        .unwrap_or(false)
}
