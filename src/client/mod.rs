//! Client side of image delivery
//!
//! - [`proxy_url`] builds the `/image-proxy` URL a display component requests
//! - [`FallbackImage`] drives loading/error state with one fallback source
//! - [`BackgroundImageCache`] keeps the home page background list for a day
//!
//! Rendering is left to the host UI; these types only model state.

mod cache;
mod image;

pub use cache::{BACKGROUND_CACHE_TTL, BackgroundImageCache, KeyValueStore, MemoryStore};
pub use image::{ClientImageState, FallbackImage};

use crate::resolver::Quality;

pub const PROXY_PATH: &str = "/image-proxy";

/// `/image-proxy?id=..&quality=..&width=..&height=..`
pub fn proxy_url(id: &str, quality: Quality, width: u32, height: u32) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("id", id)
        .append_pair("quality", quality.as_str())
        .append_pair("width", &width.to_string())
        .append_pair("height", &height.to_string())
        .finish();
    format!("{PROXY_PATH}?{query}")
}

/// Background sources for the home page slideshow, skipping blank ids
pub fn background_sources<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter()
        .filter(|id| !id.as_ref().trim().is_empty())
        .map(|id| proxy_url(id.as_ref(), Quality::Background, 1200, 900))
        .collect()
}
