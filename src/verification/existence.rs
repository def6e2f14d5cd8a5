/// Existence of an identifier across the blob store and the catalog
use crate::{
    blob_store::BlobBackend, catalog::MetadataStore, error::CatalogResult,
    verification::VerificationPolicy,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistenceStatus {
    /// Original blob present at its conventional path
    Found,
    /// Catalog row present but the original blob is gone
    MetadataOnly,
    NotFound,
}

pub struct ExistenceReconciler<'a> {
    blobs: &'a dyn BlobBackend,
    metadata: &'a dyn MetadataStore,
    policy: &'a VerificationPolicy,
}

impl<'a> ExistenceReconciler<'a> {
    pub fn new(
        blobs: &'a dyn BlobBackend,
        metadata: &'a dyn MetadataStore,
        policy: &'a VerificationPolicy,
    ) -> Self {
        Self {
            blobs,
            metadata,
            policy,
        }
    }

    /// Blob presence alone answers `Found`; the catalog is only consulted
    /// when the blob is absent.
    pub async fn exists(&self, id: &str) -> CatalogResult<ExistenceStatus> {
        let path = self.policy.conventional_photo_path(id);

        if self.blobs.head(&path).await?.is_some() {
            return Ok(ExistenceStatus::Found);
        }

        match self.metadata.get_by_id(id).await? {
            Some(_) => {
                tracing::info!(id, path = %path, "Catalog record has no original blob");
                Ok(ExistenceStatus::MetadataOnly)
            }
            None => Ok(ExistenceStatus::NotFound),
        }
    }
}
