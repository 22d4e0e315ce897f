//! Catalog loading error types.

use thiserror::Error;

/// Errors raised while loading the entity catalog.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum CatalogError {
    #[error("network error while fetching catalog: {message}")]
    Network { message: String },

    #[error("catalog request failed with HTTP {status}")]
    Status { status: u16 },

    #[error("failed to decode catalog response: {message}")]
    Decode { message: String },
}

impl CatalogError {
    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}
