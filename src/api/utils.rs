//! API utility functions
//!
//! Pure, stateless helpers for shaping proxy responses and listing static
//! images. Kept out of services.rs so they can be unit tested.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Method, header},
    response::{IntoResponse, Redirect, Response},
};
use tracing::warn;

use crate::api::error::ApiError;
use crate::proxy::{FallbackRedirect, ProxiedImage, ProxyOutcome};

pub const X_IMAGE_QUALITY: HeaderName = HeaderName::from_static("x-image-quality");
pub const X_MOBILE_OPTIMIZED: HeaderName = HeaderName::from_static("x-mobile-optimized");
pub const X_FALLBACK_REASON: HeaderName = HeaderName::from_static("x-fallback-reason");

const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

/// Only GET reaches the proxy pipeline or the image listing
pub fn ensure_get(method: &Method) -> Result<(), ApiError> {
    if *method == Method::GET {
        Ok(())
    } else {
        Err(ApiError::MethodNotAllowed(method.to_string()))
    }
}

/// User agent header as text, if present and valid
pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

pub fn outcome_response(outcome: ProxyOutcome) -> Response {
    match outcome {
        ProxyOutcome::Image(image) => image_response(image),
        ProxyOutcome::Redirect(redirect) => fallback_response(redirect),
    }
}

/// 200 with the upstream bytes and cache/CORS headers
pub fn image_response(image: ProxiedImage) -> Response {
    let mut response = Body::from(image.bytes).into_response();
    let headers = response.headers_mut();

    insert_header(headers, header::CONTENT_TYPE, &image.content_type);
    insert_header(headers, header::CACHE_CONTROL, &image.cache_policy.header_value());
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET"));
    headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding, User-Agent"));
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(X_IMAGE_QUALITY, HeaderValue::from_static(image.quality.as_str()));
    headers.insert(
        X_MOBILE_OPTIMIZED,
        HeaderValue::from_static(if image.device.is_mobile() { "true" } else { "false" }),
    );

    response
}

/// 307 to the authenticated fallback endpoint
pub fn fallback_response(redirect: FallbackRedirect) -> Response {
    let mut response = Redirect::temporary(&redirect.location).into_response();
    insert_header(
        response.headers_mut(),
        X_FALLBACK_REASON,
        &redirect.reason.to_string(),
    );
    response
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => warn!(header = %name, value, "Dropping invalid header value"),
    }
}

/// Static gallery images: `wedding-*` with an image extension, as sorted
/// root-relative paths
pub fn select_wedding_images<I, S>(file_names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut images: Vec<String> = file_names
        .into_iter()
        .filter(|name| {
            let lower = name.as_ref().to_lowercase();
            lower.starts_with("wedding-") && IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        })
        .map(|name| format!("/{}", name.as_ref()))
        .collect();

    images.sort();
    images
}
