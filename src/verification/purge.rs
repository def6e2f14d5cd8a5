/// Bounded destructive purge of both stores
///
/// Callers must authorize before reaching this module. One call deletes at
/// most `purge_cap` blobs; `StoragePurge::CapReached` tells the caller to
/// invoke it again.
use crate::{
    blob_store::{BlobBackend, ListOptions},
    catalog::MetadataStore,
    error::CatalogResult,
    verification::{Deadline, VerificationPolicy},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatabasePurge {
    Completed {
        #[serde(rename = "recordsDeleted")]
        records_deleted: u64,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StoragePurge {
    Completed {
        #[serde(rename = "objectsDeleted")]
        objects_deleted: u64,
    },
    /// Stopped at the cap; more objects may remain
    CapReached {
        #[serde(rename = "objectsDeleted")]
        objects_deleted: u64,
        cap: u64,
    },
    /// Storage state is indeterminate until re-verified
    Failed {
        #[serde(rename = "objectsDeleted")]
        objects_deleted: u64,
        partial: bool,
        error: String,
    },
}

impl StoragePurge {
    pub fn objects_deleted(&self) -> u64 {
        match self {
            StoragePurge::Completed { objects_deleted }
            | StoragePurge::CapReached { objects_deleted, .. }
            | StoragePurge::Failed { objects_deleted, .. } => *objects_deleted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeReport {
    pub database: DatabasePurge,
    pub storage: StoragePurge,
}

impl PurgeReport {
    pub fn is_success(&self) -> bool {
        !matches!(self.database, DatabasePurge::Failed { .. })
            && !matches!(self.storage, StoragePurge::Failed { .. })
    }
}

pub struct BoundedPurger<'a> {
    blobs: &'a dyn BlobBackend,
    metadata: &'a dyn MetadataStore,
    policy: &'a VerificationPolicy,
    deadline: Deadline,
}

impl<'a> BoundedPurger<'a> {
    pub fn new(
        blobs: &'a dyn BlobBackend,
        metadata: &'a dyn MetadataStore,
        policy: &'a VerificationPolicy,
        deadline: Deadline,
    ) -> Self {
        Self {
            blobs,
            metadata,
            policy,
            deadline,
        }
    }

    /// Purge the catalog, then storage; a failure in one part does not skip the other
    pub async fn purge_all(&self) -> PurgeReport {
        let database = self.purge_database().await;
        let storage = self.purge_storage().await;

        tracing::warn!(?database, ?storage, "Catalog purge finished");

        PurgeReport { database, storage }
    }

    async fn purge_database(&self) -> DatabasePurge {
        match self.deadline.run(self.metadata.delete_all()).await {
            Ok(records_deleted) => DatabasePurge::Completed { records_deleted },
            Err(e) => {
                tracing::error!(error = %e, "Failed to purge catalog records");
                DatabasePurge::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn purge_storage(&self) -> StoragePurge {
        let cap = self.policy.purge_cap;
        let mut deleted = 0;

        match self.drain(cap, &mut deleted).await {
            Ok(()) if deleted >= cap => StoragePurge::CapReached {
                objects_deleted: deleted,
                cap,
            },
            Ok(()) => StoragePurge::Completed {
                objects_deleted: deleted,
            },
            Err(e) => {
                tracing::error!(deleted, error = %e, "Blob purge failed; storage state is indeterminate");
                StoragePurge::Failed {
                    objects_deleted: deleted,
                    partial: deleted > 0,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Delete listed objects until the store is empty or `cap` deletions happened
    async fn drain(&self, cap: u64, deleted: &mut u64) -> CatalogResult<()> {
        let mut cursor: Option<String> = None;

        while *deleted < cap {
            let options = ListOptions::new(self.policy.purge_page_size).with_cursor(cursor.take());
            let page = self.deadline.run(self.blobs.list(&options)).await?;

            if page.objects.is_empty() {
                break;
            }

            for object in &page.objects {
                if *deleted >= cap {
                    return Ok(());
                }

                self.deadline.check()?;
                self.blobs.delete(&object.key).await?;
                *deleted += 1;
            }

            match page.next_cursor() {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }

        Ok(())
    }
}
