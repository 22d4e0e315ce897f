//! Domain layer with core entities, modifiers and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Modifiers and modifier chains.
pub mod modifier;
/// Port definitions.
pub mod ports;

pub use entities::{CompositeKey, LoadedImage, Source};
pub use errors::{PipelineError, PipelineResult};
pub use modifier::{Modifier, ModifierChain};
pub use ports::{EventSink, ImageCachePort, PipelineEvent, SourceFetcher};
