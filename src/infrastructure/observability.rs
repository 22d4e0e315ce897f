//! Event sink that forwards pipeline events to `tracing`.

use tracing::{info, warn};

use crate::domain::ports::{EventSink, PipelineEvent};

/// Logs each event under the `refract::events` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::CacheHit { key } => {
                info!(target: "refract::events", key = %key, "cache hit");
            }
            PipelineEvent::CacheMiss { key } => {
                info!(target: "refract::events", key = %key, "cache miss");
            }
            PipelineEvent::CacheStore { key, bytes } => {
                info!(target: "refract::events", key = %key, bytes = bytes, "cache store");
            }
            PipelineEvent::CacheEviction { key, bytes } => {
                info!(target: "refract::events", key = %key, bytes = bytes, "cache eviction");
            }
            PipelineEvent::CacheInvalidated { key } => {
                info!(target: "refract::events", key = %key, "cache invalidated");
            }
            PipelineEvent::CacheCleared { entries } => {
                info!(target: "refract::events", entries = entries, "cache cleared");
            }
            PipelineEvent::RequestStarted { key, url } => {
                info!(target: "refract::events", key = %key, url = %url, "request started");
            }
            PipelineEvent::RequestCoalesced { key, waiters } => {
                info!(target: "refract::events", key = %key, waiters = waiters, "request coalesced");
            }
            PipelineEvent::RequestCompleted { key, waiters } => {
                info!(target: "refract::events", key = %key, waiters = waiters, "request completed");
            }
            PipelineEvent::RequestFailed { key, error } => {
                warn!(target: "refract::events", key = %key, kind = error.kind(), error = %error, "request failed");
            }
            PipelineEvent::IdentifierConflict(conflict) => {
                warn!(
                    target: "refract::events",
                    identifier = %conflict.identifier,
                    registered = conflict.registered_kind,
                    conflicting = conflict.conflicting_kind,
                    "modifier identifier shared by different modifier types"
                );
            }
        }
    }
}
