//! Source fetching over HTTP and the local filesystem, plus decoding.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::domain::entities::Source;
use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::ports::{ImageDecoder, SourceFetcher};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("refract/", env!("CARGO_PKG_VERSION"));

/// Fetches `http(s)://` sources with `reqwest` and `file://` sources from disk.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the given transport timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> PipelineResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent.unwrap_or(USER_AGENT))
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::fetch("", format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { http_client })
    }

    /// Creates a fetcher with the default timeout.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn with_defaults() -> PipelineResult<Self> {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS), None)
    }

    async fn download(&self, url: &str) -> PipelineResult<Bytes> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::fetch(url, format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PipelineError::fetch(
                url,
                format!(
                    "HTTP {}: {}",
                    response.status().as_u16(),
                    response.status().canonical_reason().unwrap_or("Unknown")
                ),
            ));
        }

        response
            .bytes()
            .await
            .map_err(|e| PipelineError::fetch(url, format!("Failed to read body: {e}")))
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, source: &Source) -> PipelineResult<Bytes> {
        if let Some(path) = source.file_path() {
            debug!(path = %path.display(), "Reading image from disk");
            return tokio::fs::read(&path)
                .await
                .map(Bytes::from)
                .map_err(|e| PipelineError::fetch(source.as_str(), format!("Failed to read file: {e}")));
        }

        if !source.is_http() {
            return Err(PipelineError::fetch(
                source.as_str(),
                "unsupported source scheme",
            ));
        }

        debug!(url = %source, "Downloading image from network");
        self.download(source.as_str()).await
    }
}

/// Decodes PNG, JPEG and WebP data with the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> PipelineResult<image::DynamicImage> {
        if bytes.is_empty() {
            return Err(PipelineError::decode("empty response body"));
        }
        let image = image::load_from_memory(bytes)
            .map_err(|e| PipelineError::decode(format!("Failed to decode image: {e}")))?;
        if image.width() == 0 || image.height() == 0 {
            return Err(PipelineError::decode("decoded image has no pixel data"));
        }
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::png_bytes;
    use tokio_test::assert_ok;

    #[test]
    fn test_decode_png() {
        let image = assert_ok!(ImageCrateDecoder.decode(&png_bytes(3, 2, [1, 2, 3, 255])));
        assert_eq!((image.width(), image.height()), (3, 2));
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let err = ImageCrateDecoder.decode(b"definitely not an image").unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_decode_empty_is_decode_error() {
        assert!(ImageCrateDecoder.decode(&[]).unwrap_err().is_decode());
    }

    #[tokio::test]
    async fn test_fetch_file_source() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("art.png");
        std::fs::write(&path, png_bytes(2, 2, [9, 9, 9, 255]))?;

        let fetcher = HttpFetcher::with_defaults()?;
        let source = Source::new(format!("file://{}", path.display()));
        let bytes = fetcher.fetch(&source).await?;

        assert_eq!(bytes, png_bytes(2, 2, [9, 9, 9, 255]));
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_fetch_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        let source = Source::new(format!("file://{}", dir.path().join("nope.png").display()));

        let err = HttpFetcher::with_defaults()?.fetch(&source).await.unwrap_err();
        assert!(err.is_fetch());
        Ok(())
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_fetch_error() -> Result<(), Box<dyn std::error::Error>> {
        let err = HttpFetcher::with_defaults()?
            .fetch(&Source::new("ftp://example.com/a.png"))
            .await
            .unwrap_err();
        assert!(err.is_fetch());
        Ok(())
    }
}
