use std::sync::Arc;

use axum::{Router, routing::any, routing::get};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use super::{
    services::{health, image_proxy, metrics, wedding_images},
    state::AppState,
};
use crate::config::Config;
use crate::limiter::RateLimiter;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All routes with state and middleware attached
pub fn router(state: AppState) -> Router {
    Router::new()
        // Method checks happen in the handlers so rejections carry a JSON body
        .route("/image-proxy", any(image_proxy))
        .route("/wedding-images", any(wedding_images))
        .route("/operators/metrics", get(metrics))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(config: Config) -> Result<(), AnyError> {
    let address = config.server.bind_addr;
    let sweep_interval = config.rate_limit.sweep_interval.as_duration();

    info!(
        upstream = %config.upstream.base_url,
        max_requests = config.rate_limit.max_requests,
        window = %config.rate_limit.window,
        fallback = %config.proxy.fallback_path,
        "Building application state"
    );
    let state = AppState::from_config(config)?;

    let sweeper = spawn_sweeper(state.limiter.clone(), sweep_interval);
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "mediagate listening");

    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.abort();
    served?;

    Ok(())
}

/// Periodically drop rate windows that have fully expired
fn spawn_sweeper(limiter: Arc<RateLimiter>, every: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.sweep();
            debug!(removed, tracked = limiter.tracked_ids(), "Rate limiter sweep");
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
