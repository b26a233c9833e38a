use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use std::path::Path;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use super::{
    models::{DEFAULT_WEDDING_IMAGES, ImageProxyQuery, WeddingImagesError},
    state::AppState,
    utils::{ensure_get, outcome_response, select_wedding_images, user_agent},
};
use crate::api::error::ApiError;
use crate::resolver::{ClientContext, MediaRequest};

/// Image proxy endpoint (GET /image-proxy)
///
/// ## Flow:
/// 1. Reject anything but GET (405) and a missing `id` (400) with JSON
/// 2. Rate limit per id; over the limit goes straight to the fallback
/// 3. Resolve the upstream URL for the quality tier and device class
/// 4. Fetch once with a bounded timeout
/// 5. Forward image bytes with cache headers, or 307 to the fallback
///
/// Everything after step 1 answers either 200 or 307.
pub async fn image_proxy(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    query: Result<Query<ImageProxyQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let (request, client) = match parse_proxy_request(&method, &headers, query) {
        Ok(parsed) => parsed,
        Err(e) => {
            info!(%method, error = %e, "Rejected image proxy request");
            state.metrics.request_rejected();
            return Err(e);
        }
    };

    let request_id = Uuid::now_v7();
    let span = info_span!("image_proxy", %request_id, id = %request.id);
    let outcome = state
        .proxy
        .handle_guarded(request, client)
        .instrument(span)
        .await;
    Ok(outcome_response(outcome))
}

fn parse_proxy_request(
    method: &Method,
    headers: &HeaderMap,
    query: Result<Query<ImageProxyQuery>, QueryRejection>,
) -> Result<(MediaRequest, ClientContext), ApiError> {
    ensure_get(method)?;
    let Query(query) = query.map_err(|e| ApiError::InvalidQuery(e.body_text()))?;
    let request = query.into_media_request()?;
    Ok((request, ClientContext::new(user_agent(headers))))
}

/// Static login-page images (GET /wedding-images)
pub async fn wedding_images(
    State(state): State<AppState>,
    method: Method,
) -> Result<Response, ApiError> {
    ensure_get(&method)?;

    let static_dir = &state.config.server.static_dir;
    match list_wedding_images(static_dir).await {
        Ok(images) if images.is_empty() => Ok(Json(default_wedding_images()).into_response()),
        Ok(images) => Ok(Json(images).into_response()),
        Err(e) => {
            error!(dir = %static_dir.display(), error = %e, "Error reading wedding images");
            let body = WeddingImagesError {
                error: "Failed to load images".to_string(),
                fallback: default_wedding_images(),
            };
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
        }
    }
}

async fn list_wedding_images(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(select_wedding_images(names))
}

fn default_wedding_images() -> Vec<String> {
    DEFAULT_WEDDING_IMAGES.iter().map(|p| p.to_string()).collect()
}

/// Counter snapshot (GET /operators/metrics)
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

/// Health check (GET /health)
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
