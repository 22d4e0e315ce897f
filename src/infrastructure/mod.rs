//! Infrastructure layer with external service adapters.

/// Catalog search client.
pub mod catalog;
/// Application configuration.
pub mod config;
/// Image pipeline (fetching, caching, transforming).
pub mod image;
/// Event sinks.
pub mod observability;

pub use catalog::CatalogClient;
pub use config::{AppConfig, CatalogConfig, CliArgs, ConfigStore, LogLevel};
pub use image::{
    BlurModifier, CacheStats, DebugConfig, HttpFetcher, ImageCrateDecoder, MemoryImageCache,
    MonoModifier, Pipeline, PipelineConfig, ScaleModifier,
};
pub use observability::TracingEventSink;
