//! Async image pipeline orchestrator.
//!
//! Cache lookup, request coalescing, then fetch -> decode -> transform on a
//! miss. One execution runs per composite key; every request that arrives
//! while it is in flight waits on the same outcome.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, oneshot};
use tracing::{debug, info, trace, warn};

use crate::domain::entities::{CompositeKey, ImageOrigin, LoadedImage, Source};
use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::modifier::{IdentifierRegistry, ModifierChain};
use crate::domain::ports::{EventSink, ImageCachePort, ImageDecoder, PipelineEvent, SourceFetcher};
use crate::infrastructure::observability::TracingEventSink;

use super::fetcher::{DEFAULT_TIMEOUT_SECS, HttpFetcher, ImageCrateDecoder};
use super::memory_cache::{DEFAULT_MAX_BYTES, DEFAULT_MAX_ENTRIES, MemoryImageCache};

/// Independent debug toggles for the pipeline and its cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Emit request lifecycle events.
    #[serde(default)]
    pub pipeline_debug: bool,
    /// Emit cache hit/miss/eviction events.
    #[serde(default)]
    pub cache_debug: bool,
}

/// Configuration for the image pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Memory budget for cached pixel data, in bytes.
    #[serde(default = "default_memory_cache_bytes")]
    pub memory_cache_bytes: usize,
    /// Maximum number of cached images.
    #[serde(default = "default_memory_cache_entries")]
    pub memory_cache_entries: usize,
    /// Maximum concurrent fetches.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    /// Transport timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// User agent sent with HTTP requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Debug toggles.
    #[serde(flatten)]
    pub debug: DebugConfig,
}

fn default_memory_cache_bytes() -> usize {
    DEFAULT_MAX_BYTES
}

fn default_memory_cache_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_max_concurrent_fetches() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            memory_cache_bytes: default_memory_cache_bytes(),
            memory_cache_entries: default_memory_cache_entries(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            timeout_secs: default_timeout_secs(),
            user_agent: None,
            debug: DebugConfig::default(),
        }
    }
}

type Completion = Box<dyn FnOnce(PipelineResult<LoadedImage>) + Send>;

/// One party waiting on an execution.
enum Waiter {
    Channel(oneshot::Sender<PipelineResult<LoadedImage>>),
    Callback(Completion),
}

impl Waiter {
    fn deliver(self, result: PipelineResult<LoadedImage>) {
        match self {
            Self::Channel(tx) => {
                let _ = tx.send(result);
            }
            Self::Callback(completion) => {
                // A panicking completion must not skip the waiters behind it.
                if panic::catch_unwind(AssertUnwindSafe(|| completion(result))).is_err() {
                    warn!("Request completion panicked");
                }
            }
        }
    }
}

/// In-flight execution for one key and everyone waiting on it.
struct PendingRequest {
    waiters: Vec<Waiter>,
}

struct PipelineInner {
    cache: Arc<dyn ImageCachePort>,
    fetcher: Arc<dyn SourceFetcher>,
    decoder: Arc<dyn ImageDecoder>,
    sink: Arc<dyn EventSink>,
    pending: Mutex<HashMap<CompositeKey, PendingRequest>>,
    registry: IdentifierRegistry,
    semaphore: Semaphore,
    debug_enabled: AtomicBool,
}

impl PipelineInner {
    fn emit(&self, event: PipelineEvent) {
        if self.debug_enabled.load(Ordering::Relaxed) {
            self.sink.record(&event);
        }
    }

    async fn materialize(
        &self,
        key: &CompositeKey,
        source: &Source,
        chain: &ModifierChain,
    ) -> PipelineResult<LoadedImage> {
        if let Some(image) = self.cache.peek(key) {
            trace!(key = %key, "Image cached while request was queued");
            return Ok(LoadedImage {
                key: key.clone(),
                image,
                origin: ImageOrigin::Cache,
            });
        }

        let bytes = {
            let _permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|e| PipelineError::interrupted(format!("Fetch queue closed: {e}")))?;
            self.emit(PipelineEvent::RequestStarted {
                key: key.clone(),
                url: source.to_string(),
            });
            debug!(key = %key, url = %source, "Fetching image");
            self.fetcher.fetch(source).await?
        };

        let decoder = self.decoder.clone();
        let chain = chain.clone();
        let image = tokio::task::spawn_blocking(move || {
            let decoded = decoder.decode(&bytes)?;
            chain.apply(decoded)
        })
        .await
        .map_err(|e| PipelineError::interrupted(format!("Decode task panicked: {e}")))??;

        let image = Arc::new(image);
        self.cache.put(key.clone(), image.clone());

        Ok(LoadedImage {
            key: key.clone(),
            image,
            origin: ImageOrigin::Network,
        })
    }
}

/// Owns one execution's pending record. Dropping it without completing
/// (a panic in the execution task) still notifies every waiter.
///
/// The release profile sets `panic = "abort"`, so there a panicking fetcher
/// or modifier ends the process and no waiter is notified. The guard only
/// takes effect in unwinding builds such as dev and test.
struct Execution {
    inner: Arc<PipelineInner>,
    key: CompositeKey,
    completed: bool,
}

impl Execution {
    fn complete(&mut self, result: &PipelineResult<LoadedImage>) {
        let waiters = self
            .inner
            .pending
            .lock()
            .remove(&self.key)
            .map(|pending| pending.waiters)
            .unwrap_or_default();

        match result {
            Ok(_) => {
                debug!(key = %self.key, waiters = waiters.len(), "Image ready");
                self.inner.emit(PipelineEvent::RequestCompleted {
                    key: self.key.clone(),
                    waiters: waiters.len(),
                });
            }
            Err(error) => {
                warn!(key = %self.key, waiters = waiters.len(), error = %error, "Image request failed");
                self.inner.emit(PipelineEvent::RequestFailed {
                    key: self.key.clone(),
                    error: error.clone(),
                });
            }
        }

        for waiter in waiters {
            waiter.deliver(result.clone());
        }

        self.inner.cache.unpin(&self.key);
        self.completed = true;
    }
}

impl Drop for Execution {
    fn drop(&mut self) {
        if !self.completed {
            self.complete(&Err(PipelineError::interrupted(
                "execution stopped before producing an outcome",
            )));
        }
    }
}

/// Orchestrates cached, coalesced, transformed image requests.
///
/// Cheap to clone; clones share the cache and the pending table. Construct
/// one per application and hand it to consumers.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("pending", &self.pending_count())
            .field("cached", &self.inner.cache.len())
            .field("debug_enabled", &self.debug_enabled())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    fetcher: Arc<dyn SourceFetcher>,
    cache: Option<Arc<dyn ImageCachePort>>,
    decoder: Arc<dyn ImageDecoder>,
    sink: Arc<dyn EventSink>,
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Uses `cache` instead of a fresh [`MemoryImageCache`].
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn ImageCachePort>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Uses `decoder` instead of [`ImageCrateDecoder`].
    #[must_use]
    pub fn decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Routes pipeline events to `sink`.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Applies `config`.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        let cache = self.cache.unwrap_or_else(|| {
            Arc::new(
                MemoryImageCache::new(
                    self.config.memory_cache_bytes,
                    self.config.memory_cache_entries,
                )
                .with_sink(self.sink.clone()),
            )
        });
        cache.set_debug_enabled(self.config.debug.cache_debug);

        Pipeline {
            inner: Arc::new(PipelineInner {
                cache,
                fetcher: self.fetcher,
                decoder: self.decoder,
                sink: self.sink,
                pending: Mutex::new(HashMap::new()),
                registry: IdentifierRegistry::new(),
                semaphore: Semaphore::new(self.config.max_concurrent_fetches.max(1)),
                debug_enabled: AtomicBool::new(self.config.debug.pipeline_debug),
            }),
        }
    }
}

impl Pipeline {
    /// Starts building a pipeline around `fetcher`.
    #[must_use]
    pub fn builder(fetcher: Arc<dyn SourceFetcher>) -> PipelineBuilder {
        PipelineBuilder {
            fetcher,
            cache: None,
            decoder: Arc::new(ImageCrateDecoder),
            sink: Arc::new(TracingEventSink),
            config: PipelineConfig::default(),
        }
    }

    /// Creates a pipeline with an HTTP fetcher and a memory cache sized by `config`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn with_config(config: PipelineConfig) -> PipelineResult<Self> {
        let fetcher = HttpFetcher::new(
            Duration::from_secs(config.timeout_secs),
            config.user_agent.as_deref(),
        )?;
        info!(
            max_concurrent_fetches = config.max_concurrent_fetches,
            memory_cache_bytes = config.memory_cache_bytes,
            "Image pipeline created"
        );
        Ok(Self::builder(Arc::new(fetcher)).config(config).build())
    }

    /// Loads `source` transformed by `chain`, waiting for the outcome.
    ///
    /// # Errors
    /// Returns the fetch, decode or transform failure of the execution this
    /// call joined.
    pub async fn load(
        &self,
        source: &Source,
        chain: &ModifierChain,
    ) -> PipelineResult<LoadedImage> {
        match self.begin(source, chain) {
            Ticket::Ready(loaded) => Ok(loaded),
            Ticket::Miss(key) => {
                let (tx, rx) = oneshot::channel();
                self.join_or_start(key, source, chain, Waiter::Channel(tx));
                Self::settle(rx).await
            }
        }
    }

    /// Requests `source` transformed by `chain` and calls `completion` with
    /// the outcome.
    ///
    /// Registration happens before this returns, so same-key requests join
    /// in call order, and completions of requests that joined one execution
    /// run one after another in that order on the execution's task. A cache
    /// hit runs `completion` on its own spawned task. `completion` never runs
    /// inside this call. Must be called from within a tokio runtime.
    pub fn request<F>(&self, source: &Source, chain: &ModifierChain, completion: F)
    where
        F: FnOnce(PipelineResult<LoadedImage>) + Send + 'static,
    {
        match self.begin(source, chain) {
            Ticket::Ready(loaded) => {
                tokio::spawn(async move { completion(Ok(loaded)) });
            }
            Ticket::Miss(key) => {
                self.join_or_start(key, source, chain, Waiter::Callback(Box::new(completion)));
            }
        }
    }

    /// Warms the cache for `source` and `chain` without a completion.
    pub fn prefetch(&self, source: &Source, chain: &ModifierChain) {
        self.request(source, chain, |result| {
            if let Err(e) = result {
                debug!(error = %e, "Prefetch failed");
            }
        });
    }

    /// Removes the cached result for `source` and `chain`.
    pub fn invalidate(&self, source: &Source, chain: &ModifierChain) {
        self.inner
            .cache
            .invalidate(&CompositeKey::derive(source, chain));
    }

    /// Clears the cache. In-flight executions are unaffected.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
        info!("Cleared image cache");
    }

    /// Returns the cache shared by this pipeline.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn ImageCachePort> {
        &self.inner.cache
    }

    /// Returns true while an execution for `key` is in flight.
    #[must_use]
    pub fn is_loading(&self, key: &CompositeKey) -> bool {
        self.inner.pending.lock().contains_key(key)
    }

    /// Returns the number of in-flight executions.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Returns whether pipeline events are emitted.
    #[must_use]
    pub fn debug_enabled(&self) -> bool {
        self.inner.debug_enabled.load(Ordering::Relaxed)
    }

    /// Enables or disables pipeline event emission.
    pub fn set_debug_enabled(&self, enabled: bool) {
        self.inner.debug_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Enables or disables cache event emission.
    pub fn set_cache_debug_enabled(&self, enabled: bool) {
        self.inner.cache.set_debug_enabled(enabled);
    }

    fn begin(&self, source: &Source, chain: &ModifierChain) -> Ticket {
        let key = CompositeKey::derive(source, chain);

        for conflict in self.inner.registry.observe(chain) {
            warn!(
                identifier = %conflict.identifier,
                registered = conflict.registered_kind,
                conflicting = conflict.conflicting_kind,
                "Modifier identifier reused by a different modifier type; cached results may be wrong"
            );
            self.inner.emit(PipelineEvent::IdentifierConflict(conflict));
        }

        if let Some(image) = self.inner.cache.get(&key) {
            return Ticket::Ready(LoadedImage {
                key,
                image,
                origin: ImageOrigin::Cache,
            });
        }

        Ticket::Miss(key)
    }

    fn join_or_start(
        &self,
        key: CompositeKey,
        source: &Source,
        chain: &ModifierChain,
        waiter: Waiter,
    ) {
        let joined = {
            let mut pending = self.inner.pending.lock();
            match pending.entry(key.clone()) {
                Entry::Occupied(mut entry) => {
                    entry.get_mut().waiters.push(waiter);
                    Some(entry.get().waiters.len())
                }
                Entry::Vacant(entry) => {
                    entry.insert(PendingRequest {
                        waiters: vec![waiter],
                    });
                    None
                }
            }
        };

        if let Some(waiters) = joined {
            trace!(key = %key, waiters = waiters, "Joined in-flight request");
            self.inner
                .emit(PipelineEvent::RequestCoalesced { key, waiters });
            return;
        }

        self.inner.cache.pin(&key);
        let mut execution = Execution {
            inner: self.inner.clone(),
            key,
            completed: false,
        };
        let source = source.clone();
        let chain = chain.clone();

        tokio::spawn(async move {
            let result = execution
                .inner
                .clone()
                .materialize(&execution.key, &source, &chain)
                .await;
            execution.complete(&result);
        });
    }

    async fn settle(
        rx: oneshot::Receiver<PipelineResult<LoadedImage>>,
    ) -> PipelineResult<LoadedImage> {
        rx.await.unwrap_or_else(|_| {
            Err(PipelineError::interrupted(
                "execution dropped without an outcome",
            ))
        })
    }
}

enum Ticket {
    Ready(LoadedImage),
    Miss(CompositeKey),
}
