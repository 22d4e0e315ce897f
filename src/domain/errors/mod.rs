//! Domain error types.

mod catalog_error;
mod pipeline_error;

pub use catalog_error::CatalogError;
pub use pipeline_error::{ModifierError, PipelineError, PipelineResult};
