//! Catalog loading use case.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::entities::CatalogEntity;
use crate::domain::errors::CatalogError;
use crate::domain::ports::CatalogPort;

/// Loads the entities shown by the list view.
#[derive(Clone)]
pub struct LoadCatalogUseCase {
    catalog_port: Arc<dyn CatalogPort>,
}

impl LoadCatalogUseCase {
    /// Creates new catalog use case.
    #[must_use]
    pub const fn new(catalog_port: Arc<dyn CatalogPort>) -> Self {
        Self { catalog_port }
    }

    /// Searches for `term` and keeps only entities that carry artwork.
    ///
    /// # Errors
    /// Returns error if the catalog cannot be fetched or decoded.
    pub async fn execute(&self, term: &str, limit: u32) -> Result<Vec<CatalogEntity>, CatalogError> {
        debug!(term = term, limit = limit, "Loading catalog");

        let response = self
            .catalog_port
            .search(term, limit)
            .await
            .inspect_err(|e| warn!(error = %e, "Catalog search failed"))?;

        let total = response.results.len();
        let entities: Vec<_> = response
            .results
            .into_iter()
            .filter(|entity| entity.artwork_source().is_some())
            .collect();

        info!(
            total = total,
            with_artwork = entities.len(),
            "Catalog loaded"
        );

        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::MockCatalog;

    fn entity(name: &str, artwork: Option<&str>) -> CatalogEntity {
        CatalogEntity {
            wrapper_type: "collection".to_string(),
            artwork_url_100: artwork.map(str::to_string),
            artist_name: Some("Artist".to_string()),
            collection_name: Some(name.to_string()),
        }
    }

    #[tokio::test]
    async fn test_keeps_only_entities_with_artwork() {
        let catalog = Arc::new(MockCatalog::with_entities(vec![
            entity("One", Some("https://example.com/1.jpg")),
            entity("Two", None),
            entity("Three", Some("")),
            entity("Four", Some("https://example.com/4.jpg")),
        ]));

        let entities = LoadCatalogUseCase::new(catalog)
            .execute("anything", 50)
            .await
            .unwrap();

        let titles: Vec<_> = entities.iter().map(CatalogEntity::title).collect();
        assert_eq!(titles, ["One", "Four"]);
    }

    #[tokio::test]
    async fn test_respects_limit() {
        let catalog = Arc::new(MockCatalog::with_entities(vec![
            entity("One", Some("https://example.com/1.jpg")),
            entity("Two", Some("https://example.com/2.jpg")),
        ]));

        let entities = LoadCatalogUseCase::new(catalog)
            .execute("anything", 1)
            .await
            .unwrap();

        assert_eq!(entities.len(), 1);
    }

    #[tokio::test]
    async fn test_propagates_catalog_failure() {
        let result = LoadCatalogUseCase::new(Arc::new(MockCatalog::failing()))
            .execute("anything", 10)
            .await;

        assert!(matches!(result, Err(CatalogError::Network { .. })));
    }
}
