//! Domain entity definitions.

mod catalog;
mod image;

pub use catalog::{CatalogEntity, CatalogResponse};
pub use image::{CompositeKey, ImageOrigin, ImageStatus, LoadedImage, Source};
