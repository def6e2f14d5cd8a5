/// Photo metadata catalog
///
/// The verification subsystem only needs keyed lookup, counting and
/// deletion, so that is all the `MetadataStore` seam exposes. CRUD used by
/// the HTTP plumbing lives on `SqliteCatalog` directly.

pub mod store;

pub use store::SqliteCatalog;

use crate::{db::photo::PhotoRecord, error::CatalogResult};
use async_trait::async_trait;

/// Key-indexed photo record store
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Look up a record by id
    async fn get_by_id(&self, id: &str) -> CatalogResult<Option<PhotoRecord>>;

    /// Number of records
    async fn count(&self) -> CatalogResult<u64>;

    /// Delete one record, returning whether it existed
    async fn delete_by_id(&self, id: &str) -> CatalogResult<bool>;

    /// Delete every record, returning the number of rows removed
    async fn delete_all(&self) -> CatalogResult<u64>;
}
