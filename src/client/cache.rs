use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const IMAGES_KEY: &str = "wedding-bg-images";
const TIMESTAMP_KEY: &str = "wedding-bg-images-timestamp";

/// Lifetime of a cached background list
pub const BACKGROUND_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// String key-value storage the client persists into
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

/// In-memory store
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Background image list cached for [`BACKGROUND_CACHE_TTL`].
/// Missing, expired and unreadable entries all read as a miss.
#[derive(Debug)]
pub struct BackgroundImageCache<S> {
    store: S,
    ttl: Duration,
}

impl<S: KeyValueStore> BackgroundImageCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_ttl(store, BACKGROUND_CACHE_TTL)
    }

    pub fn with_ttl(store: S, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn load(&self, now_ms: u64) -> Option<Vec<String>> {
        let stored_at: u64 = self.store.get(TIMESTAMP_KEY)?.parse().ok()?;
        let age = now_ms.saturating_sub(stored_at);
        if u128::from(age) >= self.ttl.as_millis() {
            debug!(age_ms = age, "Background image cache expired");
            return None;
        }

        let raw = self.store.get(IMAGES_KEY)?;
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(images) if !images.is_empty() => Some(images),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "Discarding unreadable background image cache");
                None
            }
        }
    }

    pub fn store(&mut self, images: &[String], now_ms: u64) -> Result<(), serde_json::Error> {
        let encoded = serde_json::to_string(images)?;
        self.store.set(IMAGES_KEY, encoded);
        self.store.set(TIMESTAMP_KEY, now_ms.to_string());
        Ok(())
    }

    pub fn clear(&mut self) {
        self.store.remove(IMAGES_KEY);
        self.store.remove(TIMESTAMP_KEY);
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}
