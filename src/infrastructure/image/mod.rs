//! Image pipeline infrastructure.
//!
//! This module provides:
//! - Memory caching with byte- and entry-bounded LRU eviction
//! - HTTP and file fetching, decoding through the `image` crate
//! - Built-in blur, mono and scale modifiers
//! - The coalescing async pipeline

pub mod fetcher;
pub mod memory_cache;
pub mod modifiers;
pub mod pipeline;

pub use fetcher::{HttpFetcher, ImageCrateDecoder};
pub use memory_cache::{CacheStats, MemoryImageCache};
pub use modifiers::{BlurModifier, MonoModifier, ScaleModifier};
pub use pipeline::{DebugConfig, Pipeline, PipelineBuilder, PipelineConfig};
