mod catalog_port;
mod event_sink_port;
mod fetcher_port;
mod image_cache_port;

pub use catalog_port::CatalogPort;
pub use event_sink_port::{EventSink, PipelineEvent};
pub use fetcher_port::{ImageDecoder, SourceFetcher};
pub use image_cache_port::ImageCachePort;

#[cfg(test)]
pub mod mocks {
    pub use super::catalog_port::mock::MockCatalog;
    pub use super::event_sink_port::MockEventSink;
    pub use super::event_sink_port::mock::RecordingSink;
    pub use super::fetcher_port::mock::{MockFetcher, png_bytes};
}
