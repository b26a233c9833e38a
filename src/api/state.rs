use std::sync::Arc;

use crate::config::Config;
use crate::limiter::{LimiterSettings, RateLimiter};
use crate::observability::Metrics;
use crate::proxy::ImageProxy;
use crate::resolver::{DriveResolver, MediaResolver};
use crate::upstream::{HttpConfig, HttpFetcher, UpstreamFetcher};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub limiter: Arc<RateLimiter>,
    pub proxy: Arc<ImageProxy>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Wire the production resolver and HTTP fetcher from configuration
    pub fn from_config(config: Config) -> Result<Self, AnyError> {
        let resolver = DriveResolver::new(&config.upstream.base_url)?;
        let fetcher = HttpFetcher::new(HttpConfig::from(&config.upstream))?;
        Ok(Self::new(config, Arc::new(resolver), Arc::new(fetcher)))
    }

    pub fn new(
        config: Config,
        resolver: Arc<dyn MediaResolver>,
        fetcher: Arc<dyn UpstreamFetcher>,
    ) -> Self {
        let limiter = RateLimiter::new(LimiterSettings::from(&config.rate_limit));
        Self::with_limiter(config, limiter, resolver, fetcher)
    }

    /// Same as [`new`](Self::new) with a caller-built limiter (custom clock)
    pub fn with_limiter(
        config: Config,
        limiter: RateLimiter,
        resolver: Arc<dyn MediaResolver>,
        fetcher: Arc<dyn UpstreamFetcher>,
    ) -> Self {
        let limiter = Arc::new(limiter);
        let metrics = Arc::new(Metrics::new());
        let proxy = ImageProxy::new(
            limiter.clone(),
            resolver,
            fetcher,
            metrics.clone(),
            config.proxy.fallback_path.clone(),
        );

        Self {
            config: Arc::new(config),
            limiter,
            proxy: Arc::new(proxy),
            metrics,
        }
    }
}
