//! Short-id registry for resolved download links.
//!
//! Telegram callback data is capped at 64 bytes, so the confirmation
//! buttons carry a short fingerprint of the resolved URL instead of the URL
//! itself. Entries are transient: they exist to bridge the gap between the
//! confirmation prompt and the button press, bounded by a TTL and a hard
//! entry cap so the map cannot grow without limit.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::core::config;

#[derive(Debug, Clone)]
struct Entry {
    url: String,
    stored_at: Instant,
}

/// Thread-safe id → URL map with TTL and capacity eviction.
pub struct LinkRegistry {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    ttl: Duration,
    max_entries: usize,
}

/// Generates a short id from a URL (first 12 hex chars of its hash).
fn fingerprint(url: &str) -> String {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    let hash = format!("{:016x}", hasher.finish());
    hash[..12].to_string()
}

/// Longer fallback id used when a truncated fingerprint collides.
fn long_fingerprint(url: &str) -> String {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

impl LinkRegistry {
    /// Registry with the configured TTL and capacity.
    pub fn from_config() -> Self {
        Self::new(config::registry::entry_ttl(), config::registry::MAX_ENTRIES)
    }

    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            max_entries,
        }
    }

    /// Stores a URL and returns its short id.
    ///
    /// Idempotent: storing the same URL again refreshes the timestamp and
    /// returns the same id. If the truncated id is already taken by a
    /// *different* URL, the full-length fingerprint is used instead so a
    /// collision can never hand out somebody else's link.
    pub async fn store(&self, url: &str) -> String {
        let mut entries = self.entries.lock().await;

        let mut id = fingerprint(url);
        if let Some(existing) = entries.get(&id) {
            if existing.url != url {
                id = long_fingerprint(url);
                log::warn!("Link id collision on {}, falling back to long id {}", fingerprint(url), id);
            }
        }

        entries.insert(
            id.clone(),
            Entry {
                url: url.to_string(),
                stored_at: Instant::now(),
            },
        );

        if entries.len() > self.max_entries {
            Self::evict_oldest(&mut entries, self.max_entries);
        }

        id
    }

    /// Looks up a URL by id. Expired or unknown ids return `None`.
    pub async fn lookup(&self, id: &str) -> Option<String> {
        let mut entries = self.entries.lock().await;
        match entries.get(id) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.url.clone()),
            Some(_) => {
                entries.remove(id);
                None
            }
            None => None,
        }
    }

    /// Removes expired entries. Returns how many were dropped.
    pub async fn cleanup(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        let removed = before - entries.len();
        if removed > 0 {
            log::debug!("Cleaned up {} expired link registry entries", removed);
        }
        removed
    }

    /// Number of live entries (expired ones may still be counted until
    /// the next lookup or cleanup touches them).
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    fn evict_oldest(entries: &mut HashMap<String, Entry>, keep: usize) {
        while entries.len() > keep {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    entries.remove(&id);
                }
                None => break,
            }
        }
    }
}
