//! Ports for fetching and decoding raw image data.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::entities::Source;
use crate::domain::errors::PipelineResult;

/// Port for fetching raw bytes from a source.
///
/// Each call resolves exactly once. Timeouts belong to the transport.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetches the raw bytes behind `source`.
    ///
    /// # Errors
    /// Returns `PipelineError::Fetch` on any transport failure.
    async fn fetch(&self, source: &Source) -> PipelineResult<Bytes>;
}

/// Port for decoding raw bytes into an image.
pub trait ImageDecoder: Send + Sync {
    /// Decodes `bytes`.
    ///
    /// # Errors
    /// Returns `PipelineError::Decode` for malformed or empty data.
    fn decode(&self, bytes: &[u8]) -> PipelineResult<image::DynamicImage>;
}
