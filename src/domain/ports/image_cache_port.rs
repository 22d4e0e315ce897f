//! Port definition for materialized image caching.

use std::sync::Arc;

use crate::domain::entities::CompositeKey;

/// Port for caching transformed images by composite key.
///
/// Implementations must be thread-safe and every operation must be atomic
/// with respect to concurrent `get`/`put`/eviction. None of the operations
/// block on I/O.
pub trait ImageCachePort: Send + Sync {
    /// Looks up an image. A miss never triggers a fetch.
    fn get(&self, key: &CompositeKey) -> Option<Arc<image::DynamicImage>>;

    /// Looks up an image without touching recency, statistics or events.
    fn peek(&self, key: &CompositeKey) -> Option<Arc<image::DynamicImage>>;

    /// Inserts or replaces an image. May evict other unpinned entries.
    fn put(&self, key: CompositeKey, image: Arc<image::DynamicImage>);

    /// Removes one entry.
    fn invalidate(&self, key: &CompositeKey);

    /// Removes every entry.
    fn clear(&self);

    /// Protects `key` from eviction until a matching [`unpin`](Self::unpin).
    fn pin(&self, key: &CompositeKey);

    /// Releases one pin on `key`.
    fn unpin(&self, key: &CompositeKey);

    /// Returns the current number of cached images.
    fn len(&self) -> usize;

    /// Returns true if the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enables or disables hit/miss/eviction event emission.
    fn set_debug_enabled(&self, enabled: bool);
}
