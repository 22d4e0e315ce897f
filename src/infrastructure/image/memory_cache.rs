//! In-memory LRU image cache implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::CompositeKey;
use crate::domain::ports::{EventSink, ImageCachePort, PipelineEvent};
use crate::infrastructure::observability::TracingEventSink;

/// Default memory budget for decoded images (64 MiB).
pub const DEFAULT_MAX_BYTES: usize = 64 * 1024 * 1024;

/// Default maximum number of cached images.
pub const DEFAULT_MAX_ENTRIES: usize = 256;

struct CacheEntry {
    image: Arc<image::DynamicImage>,
    size: usize,
}

struct CacheState {
    entries: LruCache<CompositeKey, CacheEntry>,
    pins: HashMap<CompositeKey, usize>,
    bytes: usize,
}

impl CacheState {
    fn within(&self, max_bytes: usize, max_entries: usize) -> bool {
        self.bytes <= max_bytes && self.entries.len() <= max_entries
    }

    /// Evicts least-recently-used entries until both bounds hold. Pinned
    /// entries and the most recently used entry are never evicted.
    fn trim(&mut self, max_bytes: usize, max_entries: usize) -> Vec<(CompositeKey, usize)> {
        let mut evicted = Vec::new();
        if self.within(max_bytes, max_entries) {
            return evicted;
        }

        let keep_mru = self.entries.len().saturating_sub(1);
        let candidates: Vec<CompositeKey> = self
            .entries
            .iter()
            .rev()
            .take(keep_mru)
            .map(|(key, _)| key)
            .filter(|key| !self.pins.contains_key(*key))
            .cloned()
            .collect();

        for key in candidates {
            if self.within(max_bytes, max_entries) {
                break;
            }
            if let Some(entry) = self.entries.pop(&key) {
                self.bytes -= entry.size;
                evicted.push((key, entry.size));
            }
        }

        evicted
    }
}

/// Memory-bounded LRU cache for transformed images.
/// Thread-safe; no operation holds the lock across I/O.
pub struct MemoryImageCache {
    state: Mutex<CacheState>,
    max_bytes: usize,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    debug_enabled: AtomicBool,
    sink: Arc<dyn EventSink>,
}

impl MemoryImageCache {
    /// Creates a cache bounded by `max_bytes` of pixel data and `max_entries` images.
    #[must_use]
    pub fn new(max_bytes: usize, max_entries: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                pins: HashMap::new(),
                bytes: 0,
            }),
            max_bytes,
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            debug_enabled: AtomicBool::new(false),
            sink: Arc::new(TracingEventSink),
        }
    }

    /// Creates a cache with the default limits.
    #[must_use]
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_MAX_BYTES, DEFAULT_MAX_ENTRIES)
    }

    /// Routes debug events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns whether debug events are emitted.
    #[must_use]
    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled.load(Ordering::Relaxed)
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let state = self.state.lock();
        CacheStats {
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_rate,
            size: state.entries.len(),
            bytes: state.bytes,
        }
    }

    /// Returns the pixel bytes currently held.
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.state.lock().bytes
    }

    fn emit(&self, events: impl IntoIterator<Item = PipelineEvent>) {
        if self.debug_enabled() {
            for event in events {
                self.sink.record(&event);
            }
        }
    }

    fn record_evictions(&self, evicted: Vec<(CompositeKey, usize)>) {
        if evicted.is_empty() {
            return;
        }
        self.evictions
            .fetch_add(evicted.len() as u64, Ordering::Relaxed);
        for (key, bytes) in &evicted {
            debug!(key = %key, bytes = bytes, "Evicted image from memory cache");
        }
        self.emit(
            evicted
                .into_iter()
                .map(|(key, bytes)| PipelineEvent::CacheEviction { key, bytes }),
        );
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl std::fmt::Debug for MemoryImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageCache")
            .field("max_bytes", &self.max_bytes)
            .field("max_entries", &self.max_entries)
            .field("debug_enabled", &self.debug_enabled())
            .finish_non_exhaustive()
    }
}

fn image_size(image: &image::DynamicImage) -> usize {
    image.as_bytes().len()
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries evicted by the capacity bound.
    pub evictions: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
    /// Current pixel bytes held.
    pub bytes: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images ({} KiB), {:.1}% hit rate ({} hits, {} misses, {} evictions)",
            self.size,
            self.bytes / 1024,
            self.hit_rate,
            self.hits,
            self.misses,
            self.evictions
        )
    }
}

impl ImageCachePort for MemoryImageCache {
    fn get(&self, key: &CompositeKey) -> Option<Arc<image::DynamicImage>> {
        let found = self
            .state
            .lock()
            .entries
            .get(key)
            .map(|entry| entry.image.clone());

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache hit");
            self.emit([PipelineEvent::CacheHit { key: key.clone() }]);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache miss");
            self.emit([PipelineEvent::CacheMiss { key: key.clone() }]);
        }
        found
    }

    fn peek(&self, key: &CompositeKey) -> Option<Arc<image::DynamicImage>> {
        self.state
            .lock()
            .entries
            .peek(key)
            .map(|entry| entry.image.clone())
    }

    fn put(&self, key: CompositeKey, image: Arc<image::DynamicImage>) {
        let size = image_size(&image);
        let evicted = {
            let mut state = self.state.lock();
            if let Some(old) = state.entries.put(key.clone(), CacheEntry { image, size }) {
                state.bytes -= old.size;
            }
            state.bytes += size;
            state.trim(self.max_bytes, self.max_entries)
        };

        debug!(key = %key, bytes = size, "Storing image in memory cache");
        self.emit([PipelineEvent::CacheStore { key, bytes: size }]);
        self.record_evictions(evicted);
    }

    fn invalidate(&self, key: &CompositeKey) {
        let removed = {
            let mut state = self.state.lock();
            let removed = state.entries.pop(key);
            if let Some(entry) = &removed {
                state.bytes -= entry.size;
            }
            removed
        };
        if removed.is_some() {
            debug!(key = %key, "Invalidated image in memory cache");
            self.emit([PipelineEvent::CacheInvalidated { key: key.clone() }]);
        }
    }

    fn clear(&self) {
        let entries = {
            let mut state = self.state.lock();
            let entries = state.entries.len();
            state.entries.clear();
            state.bytes = 0;
            entries
        };
        debug!(entries = entries, "Cleared memory image cache");
        self.emit([PipelineEvent::CacheCleared { entries }]);
    }

    fn pin(&self, key: &CompositeKey) {
        *self.state.lock().pins.entry(key.clone()).or_insert(0) += 1;
    }

    fn unpin(&self, key: &CompositeKey) {
        let evicted = {
            let mut state = self.state.lock();
            if let Some(count) = state.pins.get_mut(key) {
                *count -= 1;
                if *count == 0 {
                    state.pins.remove(key);
                }
            }
            state.trim(self.max_bytes, self.max_entries)
        };
        self.record_evictions(evicted);
    }

    fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    fn set_debug_enabled(&self, enabled: bool) {
        self.debug_enabled.store(enabled, Ordering::Relaxed);
        debug!(enabled = enabled, "Memory cache debug output toggled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::{MockEventSink, RecordingSink};

    fn key(name: &str) -> CompositeKey {
        CompositeKey::from_parts(name, [])
    }

    /// 10x10 RGB image, 300 bytes of pixel data.
    fn small() -> Arc<image::DynamicImage> {
        Arc::new(image::DynamicImage::new_rgb8(10, 10))
    }

    #[test]
    fn test_cache_put_and_get() {
        let cache = MemoryImageCache::new(1024 * 1024, 10);
        let img = Arc::new(image::DynamicImage::new_rgb8(100, 100));

        cache.put(key("a"), img.clone());
        let retrieved = cache.get(&key("a")).unwrap();

        assert!(Arc::ptr_eq(&retrieved, &img));
        assert_eq!(retrieved.width(), 100);
    }

    #[test]
    fn test_repeated_gets_return_same_image() {
        let cache = MemoryImageCache::new(1024 * 1024, 10);
        let img = small();
        cache.put(key("a"), img.clone());

        for _ in 0..5 {
            assert!(Arc::ptr_eq(&cache.get(&key("a")).unwrap(), &img));
        }
    }

    #[test]
    fn test_cache_miss() {
        let cache = MemoryImageCache::new(1024, 10);
        assert!(cache.get(&key("missing")).is_none());
    }

    #[test]
    fn test_put_replaces_existing_entry() {
        let cache = MemoryImageCache::new(1024 * 1024, 10);
        cache.put(key("a"), small());
        let replacement = Arc::new(image::DynamicImage::new_rgb8(20, 20));
        cache.put(key("a"), replacement.clone());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.bytes(), 20 * 20 * 3);
        assert!(Arc::ptr_eq(&cache.get(&key("a")).unwrap(), &replacement));
    }

    #[test]
    fn test_entry_bound_evicts_lru() {
        let cache = MemoryImageCache::new(1024 * 1024, 2);

        cache.put(key("1"), small());
        cache.put(key("2"), small());
        cache.put(key("3"), small());

        assert!(cache.get(&key("1")).is_none());
        assert!(cache.get(&key("2")).is_some());
        assert!(cache.get(&key("3")).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_byte_bound_evicts_lru() {
        let cache = MemoryImageCache::new(700, 100);

        cache.put(key("1"), small());
        cache.put(key("2"), small());
        assert!(cache.get(&key("1")).is_some());

        cache.put(key("3"), small());

        assert!(cache.peek(&key("2")).is_none());
        assert!(cache.peek(&key("1")).is_some());
        assert!(cache.peek(&key("3")).is_some());
        assert_eq!(cache.bytes(), 600);
    }

    #[test]
    fn test_oversized_image_is_kept_as_only_entry() {
        let cache = MemoryImageCache::new(100, 10);
        cache.put(key("1"), small());
        cache.put(key("2"), small());

        assert_eq!(cache.len(), 1);
        assert!(cache.peek(&key("2")).is_some());
    }

    #[test]
    fn test_pinned_entry_survives_eviction() {
        let cache = MemoryImageCache::new(1024 * 1024, 1);

        cache.pin(&key("pinned"));
        cache.put(key("pinned"), small());
        cache.put(key("other"), small());

        assert!(cache.peek(&key("pinned")).is_some());
        assert!(cache.peek(&key("other")).is_some());
        assert_eq!(cache.len(), 2);

        cache.put(key("third"), small());
        assert!(cache.peek(&key("pinned")).is_some());
        assert!(cache.peek(&key("other")).is_none());

        cache.unpin(&key("pinned"));
        assert_eq!(cache.len(), 1);
        assert!(cache.peek(&key("third")).is_some());
    }

    #[test]
    fn test_pins_are_counted() {
        let cache = MemoryImageCache::new(1024 * 1024, 1);
        cache.pin(&key("a"));
        cache.pin(&key("a"));
        cache.put(key("a"), small());
        cache.put(key("b"), small());
        cache.put(key("c"), small());

        cache.unpin(&key("a"));
        assert!(cache.peek(&key("a")).is_some());

        cache.unpin(&key("a"));
        assert!(cache.peek(&key("a")).is_none());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = MemoryImageCache::new(1024 * 1024, 10);
        cache.put(key("a"), small());
        cache.put(key("b"), small());

        cache.invalidate(&key("a"));
        assert!(cache.get(&key("a")).is_none());
        assert_eq!(cache.bytes(), 300);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.bytes(), 0);
    }

    #[test]
    fn test_cache_stats() {
        let cache = MemoryImageCache::new(1024 * 1024, 10);
        cache.put(key("a"), small());

        let _ = cache.get(&key("a"));
        let _ = cache.get(&key("missing"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!((stats.hit_rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_peek_does_not_promote() {
        let cache = MemoryImageCache::new(1024 * 1024, 2);

        cache.put(key("1"), small());
        cache.put(key("2"), small());
        let _ = cache.peek(&key("1"));
        cache.put(key("3"), small());

        assert!(cache.peek(&key("1")).is_none());
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_debug_events_are_emitted_when_enabled() {
        let sink = Arc::new(RecordingSink::new());
        let cache = MemoryImageCache::new(1024 * 1024, 1).with_sink(sink.clone());
        cache.set_debug_enabled(true);

        cache.put(key("a"), small());
        let _ = cache.get(&key("a"));
        let _ = cache.get(&key("b"));
        cache.put(key("b"), small());

        let events = sink.events();
        assert_eq!(
            events,
            vec![
                PipelineEvent::CacheStore {
                    key: key("a"),
                    bytes: 300
                },
                PipelineEvent::CacheHit { key: key("a") },
                PipelineEvent::CacheMiss { key: key("b") },
                PipelineEvent::CacheStore {
                    key: key("b"),
                    bytes: 300
                },
                PipelineEvent::CacheEviction {
                    key: key("a"),
                    bytes: 300
                },
            ]
        );
    }

    #[test]
    fn test_debug_disabled_emits_nothing() {
        let mut sink = MockEventSink::new();
        sink.expect_record().never();
        let cache = MemoryImageCache::new(1024 * 1024, 1).with_sink(Arc::new(sink));

        cache.put(key("a"), small());
        let _ = cache.get(&key("a"));
        cache.put(key("b"), small());
        cache.clear();

        assert!(cache.is_empty());
    }
}
