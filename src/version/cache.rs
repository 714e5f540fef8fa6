//! In-memory TTL cache for registry responses
//!
//! Entries are immutable: storing a value for an existing key replaces the entry. Expired
//! entries are removed lazily when read, and periodically by a background sweep task when a
//! cleanup interval is configured.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::types::{ImageInfo, ImageReference};
use crate::version::error::RegistryError;
use crate::version::registry::RegistryClient;

/// Registry operation a cached payload belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Tags,
    ImageInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub registry: String,
    pub repository: String,
    pub tag: String,
    pub kind: EntryKind,
}

impl CacheKey {
    pub fn new(image: &ImageReference, kind: EntryKind) -> Self {
        Self {
            registry: image.registry.clone(),
            repository: image.repository.clone(),
            tag: image.tag.clone(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePayload {
    Tags(Vec<String>),
    ImageInfo(ImageInfo),
}

#[derive(Debug)]
pub struct CacheEntry {
    pub payload: CachePayload,
    pub fetched_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    fn new(payload: CachePayload, ttl: Duration) -> Self {
        Self {
            payload,
            fetched_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) > self.ttl
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}

/// Snapshot of cache usage counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

impl CacheStats {
    /// Fraction of lookups served from the cache, 0 when there was no lookup
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

#[derive(Default)]
struct CacheStore {
    entries: RwLock<HashMap<CacheKey, Arc<CacheEntry>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStore {
    // A panic while holding the lock cannot leave the map half-updated, so poisoning is ignored
    fn read(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, Arc<CacheEntry>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, Arc<CacheEntry>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let entry = self.read().get(key).cloned();

        match entry {
            Some(entry) if entry.is_expired() => {
                self.evict(key, &entry);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Removes `expired` unless another caller already replaced or removed it
    fn evict(&self, key: &CacheKey, expired: &Arc<CacheEntry>) {
        let mut entries = self.write();
        if entries
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, expired))
        {
            entries.remove(key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Evicted expired cache entry {}/{}:{} ({:?})",
                key.registry, key.repository, key.tag, key.kind
            );
        }
    }

    fn insert(&self, key: CacheKey, entry: CacheEntry) {
        self.write().insert(key, Arc::new(entry));
    }

    fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - entries.len();
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }
}

/// TTL-bounded store for registry responses, safe to share between concurrent scans
pub struct RegistryCache {
    store: Arc<CacheStore>,
    default_ttl: Duration,
    sweeper: Option<CancellationToken>,
}

impl RegistryCache {
    /// Creates a cache whose entries live for `default_ttl` unless stored with their own TTL.
    ///
    /// A non-zero `cleanup_interval` starts a background sweep on the current tokio runtime.
    /// Without a runtime, or with a zero interval, expired entries are only removed when read.
    pub fn new(default_ttl: Duration, cleanup_interval: Duration) -> Self {
        let store = Arc::new(CacheStore::default());

        let sweeper = if cleanup_interval.is_zero() {
            None
        } else {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let token = CancellationToken::new();
                    handle.spawn(sweep_expired(
                        Arc::downgrade(&store),
                        cleanup_interval,
                        token.clone(),
                    ));
                    Some(token)
                }
                Err(_) => {
                    warn!("No tokio runtime available, cache sweep disabled");
                    None
                }
            }
        };

        Self {
            store,
            default_ttl,
            sweeper,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.cleanup_interval())
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns a copy of the cached tags, or None on a miss
    pub fn get_tags(&self, image: &ImageReference) -> Option<Vec<String>> {
        let entry = self.store.lookup(&CacheKey::new(image, EntryKind::Tags))?;
        match &entry.payload {
            CachePayload::Tags(tags) => Some(tags.clone()),
            CachePayload::ImageInfo(_) => None,
        }
    }

    pub fn set_tags(&self, image: &ImageReference, tags: &[String]) {
        self.set_tags_with_ttl(image, tags, self.default_ttl);
    }

    pub fn set_tags_with_ttl(&self, image: &ImageReference, tags: &[String], ttl: Duration) {
        self.store.insert(
            CacheKey::new(image, EntryKind::Tags),
            CacheEntry::new(CachePayload::Tags(tags.to_vec()), ttl),
        );
    }

    /// Returns a copy of the cached image info, or None on a miss
    pub fn get_image_info(&self, image: &ImageReference) -> Option<ImageInfo> {
        let entry = self
            .store
            .lookup(&CacheKey::new(image, EntryKind::ImageInfo))?;
        match &entry.payload {
            CachePayload::ImageInfo(info) => Some(info.clone()),
            CachePayload::Tags(_) => None,
        }
    }

    pub fn set_image_info(&self, image: &ImageReference, info: &ImageInfo) {
        self.set_image_info_with_ttl(image, info, self.default_ttl);
    }

    pub fn set_image_info_with_ttl(&self, image: &ImageReference, info: &ImageInfo, ttl: Duration) {
        self.store.insert(
            CacheKey::new(image, EntryKind::ImageInfo),
            CacheEntry::new(CachePayload::ImageInfo(info.clone()), ttl),
        );
    }

    /// Removes every expired entry and returns how many were removed
    pub fn remove_expired(&self) -> usize {
        self.store.remove_expired()
    }

    /// Removes all entries. Counters are left untouched.
    pub fn clear(&self) {
        self.store.write().clear();
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.store.hits.load(Ordering::Relaxed),
            misses: self.store.misses.load(Ordering::Relaxed),
            evictions: self.store.evictions.load(Ordering::Relaxed),
            size: self.len(),
        }
    }

    /// Stops the background sweep. Lazy eviction on read keeps working.
    pub fn close(&self) {
        if let Some(token) = &self.sweeper {
            token.cancel();
        }
    }
}

impl Drop for RegistryCache {
    fn drop(&mut self) {
        self.close();
    }
}

async fn sweep_expired(store: Weak<CacheStore>, interval: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let Some(store) = store.upgrade() else { break };
                let removed = store.remove_expired();
                if removed > 0 {
                    debug!("Cache sweep removed {} expired entries", removed);
                }
            }
        }
    }

    debug!("Cache sweep stopped");
}

/// Registry client consulting a [`RegistryCache`] before delegating.
///
/// Only successful responses are cached, so a transient failure is retried by the next call.
pub struct CachedRegistryClient {
    client: Arc<dyn RegistryClient>,
    cache: Arc<RegistryCache>,
}

impl CachedRegistryClient {
    pub fn new(client: Arc<dyn RegistryClient>, cache: Arc<RegistryCache>) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &Arc<RegistryCache> {
        &self.cache
    }
}

/// Wraps `client` in a cache built from `config`, or returns it unchanged when caching is disabled
pub fn with_cache(client: Arc<dyn RegistryClient>, config: &CacheConfig) -> Arc<dyn RegistryClient> {
    if !config.enabled {
        debug!("Registry cache disabled for {}", client.name());
        return client;
    }

    let cache = Arc::new(RegistryCache::from_config(config));
    Arc::new(CachedRegistryClient::new(client, cache))
}

#[async_trait::async_trait]
impl RegistryClient for CachedRegistryClient {
    fn name(&self) -> String {
        self.client.name()
    }

    async fn get_latest_tags(&self, image: &ImageReference) -> Result<Vec<String>, RegistryError> {
        if let Some(tags) = self.cache.get_tags(image) {
            debug!("Cache hit for tags of {}", image);
            return Ok(tags);
        }

        let tags = self.client.get_latest_tags(image).await?;
        self.cache.set_tags(image, &tags);
        Ok(tags)
    }

    async fn get_image_info(&self, image: &ImageReference) -> Result<ImageInfo, RegistryError> {
        if let Some(info) = self.cache.get_image_info(image) {
            debug!("Cache hit for image info of {}", image);
            return Ok(info);
        }

        let info = self.client.get_image_info(image).await?;
        self.cache.set_image_info(image, &info);
        Ok(info)
    }
}
