//! Domain types for image requests and their results.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::domain::modifier::ModifierChain;

/// Opaque origin identifier of a raw image, usually a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Source(Arc<str>);

impl Source {
    /// Creates a new `Source` from any string-like input.
    #[must_use]
    pub fn new(source: impl AsRef<str>) -> Self {
        Self(Arc::from(source.as_ref()))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the local path when this source uses the `file://` scheme.
    #[must_use]
    pub fn file_path(&self) -> Option<std::path::PathBuf> {
        self.0.strip_prefix("file://").map(std::path::PathBuf::from)
    }

    /// Returns true for `http://` and `https://` sources.
    #[must_use]
    pub fn is_http(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Cache identity of a (source, modifier chain) pair.
///
/// Every field is length-prefixed before hashing, so two different
/// `(source, [identifier, ..])` sequences never feed the same bytes to the
/// hasher. Identifier order is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey(String);

impl CompositeKey {
    /// Derives the key for `source` transformed by `chain`.
    #[must_use]
    pub fn derive(source: &Source, chain: &ModifierChain) -> Self {
        Self::from_parts(source.as_str(), chain.identifiers())
    }

    /// Derives the key from a raw source string and ordered identifiers.
    #[must_use]
    pub fn from_parts<'a>(source: &str, identifiers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut hasher = Sha256::new();
        write_field(&mut hasher, source.as_bytes());
        for identifier in identifiers {
            write_field(&mut hasher, identifier.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short prefix suitable for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

fn write_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

impl std::fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short())
    }
}

/// Status of an image in the loading pipeline, as seen by a list cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageStatus {
    /// No request has been issued for the current binding.
    #[default]
    NotStarted,
    /// A request is outstanding.
    Loading,
    /// The image is applied and ready for display.
    Ready,
    /// Loading failed with an error message.
    Failed(String),
}

impl ImageStatus {
    /// Returns true if the image is ready for rendering.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns true if the image is currently being loaded.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Returns true if loading failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns true if loading hasn't started yet.
    #[must_use]
    pub const fn is_not_started(&self) -> bool {
        matches!(self, Self::NotStarted)
    }
}

/// Where a delivered image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Served from the in-memory cache.
    Cache,
    /// Produced by a fetch, decode and transform execution.
    Network,
}

impl std::fmt::Display for ImageOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// A materialized image delivered by the pipeline.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Cache identity of the image.
    pub key: CompositeKey,
    /// The transformed image.
    pub image: Arc<image::DynamicImage>,
    /// Where the image came from.
    pub origin: ImageOrigin,
}

impl LoadedImage {
    /// Returns true if both results share the same image allocation.
    #[must_use]
    pub fn same_image(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}
