//! Catalog search HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::domain::entities::CatalogResponse;
use crate::domain::errors::CatalogError;
use crate::domain::ports::CatalogPort;

/// Default search endpoint.
pub const DEFAULT_SEARCH_URL: &str = "https://itunes.apple.com/search";
const DEFAULT_ENTITY: &str = "album";
const USER_AGENT: &str = concat!("refract/", env!("CARGO_PKG_VERSION"));

/// Searches a JSON catalog endpoint.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    search_url: String,
    entity: String,
}

impl CatalogClient {
    /// Creates a client for the default endpoint.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new() -> Result<Self, CatalogError> {
        Self::with_search_url(DEFAULT_SEARCH_URL)
    }

    /// Creates a client for a custom endpoint.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn with_search_url(search_url: impl Into<String>) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CatalogError::network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            search_url: search_url.into(),
            entity: DEFAULT_ENTITY.to_string(),
        })
    }

    /// Restricts results to `entity` records.
    #[must_use]
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = entity.into();
        self
    }

    fn decode_body(body: &[u8]) -> Result<CatalogResponse, CatalogError> {
        serde_json::from_slice(body).map_err(|e| CatalogError::decode(e.to_string()))
    }
}

#[async_trait]
impl CatalogPort for CatalogClient {
    async fn search(&self, term: &str, limit: u32) -> Result<CatalogResponse, CatalogError> {
        debug!(url = %self.search_url, term = term, limit = limit, "Searching catalog");

        let limit = limit.to_string();
        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("term", term),
                ("entity", self.entity.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| CatalogError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Catalog search failed");
            return Err(CatalogError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CatalogError::network(format!("failed to read body: {e}")))?;
        let catalog = Self::decode_body(&body)?;

        debug!(results = catalog.results.len(), "Catalog loaded");
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_body() {
        let body = br#"{
            "resultCount": 1,
            "results": [{
                "wrapperType": "collection",
                "artistName": "The Rolling Stones",
                "collectionName": "Sticky Fingers",
                "artworkUrl100": "https://example.com/100x100bb.jpg"
            }]
        }"#;

        let catalog = CatalogClient::decode_body(body).unwrap();
        assert_eq!(catalog.results.len(), 1);
        assert_eq!(catalog.results[0].title(), "Sticky Fingers");
    }

    #[test]
    fn test_decode_body_rejects_malformed_json() {
        let err = CatalogClient::decode_body(b"<html>").unwrap_err();
        assert!(matches!(err, CatalogError::Decode { .. }));
    }

    #[test]
    fn test_missing_results_is_empty_catalog() {
        let catalog = CatalogClient::decode_body(br#"{"resultCount": 0}"#).unwrap();
        assert!(catalog.results.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let client = CatalogClient::with_search_url("http://127.0.0.1:9/search").unwrap();
        let err = client.search("anything", 1).await.unwrap_err();
        assert!(matches!(err, CatalogError::Network { .. }));
    }
}
