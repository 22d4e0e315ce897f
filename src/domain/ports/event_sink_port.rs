//! Observability sink for pipeline and cache events.

use crate::domain::entities::CompositeKey;
use crate::domain::errors::PipelineError;
use crate::domain::modifier::IdentifierConflict;

/// Advisory event emitted when debug output is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PipelineEvent {
    CacheHit { key: CompositeKey },
    CacheMiss { key: CompositeKey },
    CacheStore { key: CompositeKey, bytes: usize },
    CacheEviction { key: CompositeKey, bytes: usize },
    CacheInvalidated { key: CompositeKey },
    CacheCleared { entries: usize },
    RequestStarted { key: CompositeKey, url: String },
    RequestCoalesced { key: CompositeKey, waiters: usize },
    RequestCompleted { key: CompositeKey, waiters: usize },
    RequestFailed { key: CompositeKey, error: PipelineError },
    IdentifierConflict(IdentifierConflict),
}

impl PipelineEvent {
    /// Returns true for events emitted by the cache.
    #[must_use]
    pub const fn is_cache_event(&self) -> bool {
        matches!(
            self,
            Self::CacheHit { .. }
                | Self::CacheMiss { .. }
                | Self::CacheStore { .. }
                | Self::CacheEviction { .. }
                | Self::CacheInvalidated { .. }
                | Self::CacheCleared { .. }
        )
    }
}

/// Receives pipeline events. Never affects control flow.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    /// Records one event.
    fn record(&self, event: &PipelineEvent);
}
