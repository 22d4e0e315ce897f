//! Refract - transformed, cached image loading for recycling list views.
//!
//! Images are identified by their source plus the ordered identifiers of the
//! modifiers applied to them. Identical concurrent requests share a single
//! fetch, and list slots use generation tickets so a recycled slot never
//! shows a stale image.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing use cases.
pub mod application;
/// Domain layer containing entities, modifiers, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing the pipeline and external adapters.
pub mod infrastructure;
/// Presentation layer containing the recycling list view.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "refract";
