//! API models for the image delivery endpoints.
//!
//! - `GET /image-proxy?id=..&quality=..&width=..&height=..` takes an
//!   [`ImageProxyQuery`] and answers with image bytes or a 307 to the
//!   fallback endpoint
//! - `GET /wedding-images` answers with a JSON array of static paths, or a
//!   [`WeddingImagesError`] carrying the default list
//! - validation failures answer with [`ErrorResponse`]:
//!
//! ```json
//! { "error": "Image ID is required", "code": "MISSING_ID" }
//! ```

use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::resolver::{MediaRequest, Quality};

/// Served when the static directory holds no `wedding-*` images
pub const DEFAULT_WEDDING_IMAGES: [&str; 2] = ["/wedding-couple.jpeg", "/wedding-souple-2.jpg"];

/// Raw query of `GET /image-proxy`; every field arrives as text
#[derive(Debug, Default, Deserialize, Clone)]
pub struct ImageProxyQuery {
    pub id: Option<String>,
    pub quality: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
}

impl ImageProxyQuery {
    /// Validate into a [`MediaRequest`].
    ///
    /// Only `id` is mandatory. Unknown qualities become `medium` and
    /// dimensions that are not positive integers are dropped.
    pub fn into_media_request(self) -> Result<MediaRequest, ApiError> {
        let id = self
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(ApiError::MissingId)?;

        let quality = self
            .quality
            .as_deref()
            .map(Quality::parse)
            .unwrap_or_default();

        Ok(MediaRequest {
            id,
            quality,
            width: parse_dimension(self.width.as_deref()),
            height: parse_dimension(self.height.as_deref()),
        })
    }
}

fn parse_dimension(value: Option<&str>) -> Option<u32> {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, Serialize)]
pub struct WeddingImagesError {
    pub error: String,
    pub fallback: Vec<String>,
}
