use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Cache key namespace; each carries its own expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Domain,
    Ip,
    Url,
    Email,
    Other,
}

impl CacheKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            CacheKind::Domain => "domain",
            CacheKind::Ip => "ip",
            CacheKind::Url => "url",
            CacheKind::Email => "email",
            CacheKind::Other => "other",
        }
    }

    pub fn ttl(&self) -> Duration {
        match self {
            CacheKind::Domain => Duration::from_secs(24 * 60 * 60),
            CacheKind::Ip => Duration::from_secs(12 * 60 * 60),
            CacheKind::Url => Duration::from_secs(6 * 60 * 60),
            CacheKind::Email => Duration::from_secs(60 * 60),
            CacheKind::Other => Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }
}

/// Expiring in-memory store for analysis results, keyed
/// `"<type>:<identifier>"`. Purely an optimization: the engine never
/// depends on a hit for correctness.
#[derive(Debug, Clone, Default)]
pub struct AnalysisCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(kind: CacheKind, identifier: &str) -> String {
        format!("{}:{}", kind.prefix(), identifier.to_lowercase())
    }

    pub async fn get<T: DeserializeOwned>(&self, kind: CacheKind, identifier: &str) -> Option<T> {
        let key = Self::key(kind, identifier);
        let entries = self.entries.read().await;
        let entry = entries.get(&key)?;
        if entry.expired() {
            return None;
        }
        match serde_json::from_value(entry.value.clone()) {
            Ok(value) => {
                log::debug!("Cache hit: {key}");
                Some(value)
            }
            Err(e) => {
                log::warn!("Discarding undecodable cache entry {key}: {e}");
                None
            }
        }
    }

    pub async fn put<T: Serialize>(&self, kind: CacheKind, identifier: &str, value: &T) {
        let serialized = match serde_json::to_value(value) {
            Ok(serialized) => serialized,
            Err(e) => {
                log::warn!("Not caching {identifier}: {e}");
                return;
            }
        };
        let key = Self::key(kind, identifier);
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                value: serialized,
                stored_at: Instant::now(),
                ttl: kind.ttl(),
            },
        );
    }

    /// Drop expired entries.
    pub async fn prune(&self) {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.expired());
        let removed = before - entries.len();
        if removed > 0 {
            log::debug!("Pruned {removed} expired cache entries");
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    #[cfg(test)]
    async fn put_with_ttl<T: Serialize>(
        &self,
        kind: CacheKind,
        identifier: &str,
        value: &T,
        ttl: Duration,
    ) {
        let key = Self::key(kind, identifier);
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                value: serde_json::to_value(value).unwrap(),
                stored_at: Instant::now(),
                ttl,
            },
        );
    }
}
