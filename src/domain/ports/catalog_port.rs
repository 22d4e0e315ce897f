//! Catalog port definition.

use async_trait::async_trait;

use crate::domain::entities::CatalogResponse;
use crate::domain::errors::CatalogError;

/// Port for searching the entity catalog.
#[async_trait]
pub trait CatalogPort: Send + Sync {
    /// Searches the catalog for `term`, returning at most `limit` entities.
    async fn search(&self, term: &str, limit: u32) -> Result<CatalogResponse, CatalogError>;
}
