/// Consistency verification between the metadata catalog and the blob store
///
/// The two stores are written independently, so a record can point at
/// blobs that are gone and blobs can outlive their record. Everything in
/// this module is read-only except `BoundedPurger`.

pub mod batch;
pub mod count;
pub mod existence;
pub mod integrity;
pub mod purge;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::db::photo::AssetRole;
pub use batch::{BatchSummary, BatchTally, BatchVerifier, FileCheck, NOT_IN_DATABASE};
pub use count::{CollectionCount, CollectionCounter};
pub use existence::{ExistenceReconciler, ExistenceStatus};
pub use integrity::{AssetStatus, IntegrityEvaluator, IntegrityFiles, IntegrityVerdict, IssueCode};
pub use purge::{BoundedPurger, DatabasePurge, PurgeReport, StoragePurge};

use crate::{
    blob_store::BlobBackend,
    catalog::MetadataStore,
    db::photo::PhotoRecord,
    error::{CatalogError, CatalogResult},
};
use serde::{Deserialize, Serialize};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::time::Instant;

/// Originals smaller than this many bytes are treated as corrupt
pub const MIN_ORIGINAL_SIZE: u64 = 10_000;

/// Maximum identifiers verified by one batch call; extra ids are dropped
pub const BATCH_LIMIT: usize = 100;

/// Identifiers verified concurrently within a batch
pub const BATCH_CONCURRENCY: usize = 8;

/// Maximum objects deleted by one purge call
pub const PURGE_CAP: u64 = 1_000;

/// Listing page size used while purging
pub const PURGE_PAGE_SIZE: usize = 100;

/// Listing page size used while counting
pub const COUNT_PAGE_SIZE: usize = 1_000;

/// Maximum pages the counter follows before giving up on a listing
pub const MAX_LIST_PAGES: usize = 10_000;

/// Blob prefix holding original images
pub const PHOTO_PREFIX: &str = "photos/";

/// Blob prefix holding thumbnails
pub const THUMBNAIL_PREFIX: &str = "thumbnails/";

/// Extension of the conventional original path `photos/{id}.{ext}`
pub const PHOTO_EXTENSION: &str = "jpg";

/// Operational limits and naming conventions for verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationPolicy {
    pub min_original_size: u64,
    pub batch_limit: usize,
    pub batch_concurrency: usize,
    pub purge_cap: u64,
    pub purge_page_size: usize,
    pub count_page_size: usize,
    pub max_list_pages: usize,
    pub photo_prefix: String,
    pub thumbnail_prefix: String,
    pub photo_extension: String,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            min_original_size: MIN_ORIGINAL_SIZE,
            batch_limit: BATCH_LIMIT,
            batch_concurrency: BATCH_CONCURRENCY,
            purge_cap: PURGE_CAP,
            purge_page_size: PURGE_PAGE_SIZE,
            count_page_size: COUNT_PAGE_SIZE,
            max_list_pages: MAX_LIST_PAGES,
            photo_prefix: PHOTO_PREFIX.to_string(),
            thumbnail_prefix: THUMBNAIL_PREFIX.to_string(),
            photo_extension: PHOTO_EXTENSION.to_string(),
        }
    }
}

impl VerificationPolicy {
    /// Blob key an original is expected at, independent of its record
    pub fn conventional_photo_path(&self, id: &str) -> String {
        format!("{}{}.{}", self.photo_prefix, id, self.photo_extension)
    }

    /// Identifier encoded in a key under the photo prefix
    ///
    /// `photos/ABC.jpg` and `photos/ABC.large.jpg` both yield `ABC`.
    pub fn photo_id_from_key<'k>(&self, key: &'k str) -> Option<&'k str> {
        let file_name = key.strip_prefix(self.photo_prefix.as_str())?;
        let id = file_name.split('.').next().unwrap_or("");

        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    pub fn validate(&self) -> CatalogResult<()> {
        let limits = [
            ("batch_limit", self.batch_limit),
            ("batch_concurrency", self.batch_concurrency),
            ("purge_page_size", self.purge_page_size),
            ("count_page_size", self.count_page_size),
            ("max_list_pages", self.max_list_pages),
        ];

        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(CatalogError::Validation(format!("{} must be greater than zero", name)));
        }

        if self.purge_cap == 0 {
            return Err(CatalogError::Validation(
                "purge_cap must be greater than zero".to_string(),
            ));
        }

        if self.photo_prefix.is_empty() {
            return Err(CatalogError::Validation("photo_prefix cannot be empty".to_string()));
        }

        Ok(())
    }
}

/// Point in time after which an operation must stop
///
/// `Deadline::none()` never expires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    /// Deadline `timeout` from now; a timeout past the clock's range never expires
    pub fn after(timeout: Duration) -> Self {
        Instant::now()
            .checked_add(timeout)
            .map_or(Self::none(), Self::at)
    }

    pub fn is_expired(&self) -> bool {
        self.0.map_or(false, |at| Instant::now() >= at)
    }

    /// Fail fast when the deadline has already passed
    pub fn check(&self) -> CatalogResult<()> {
        if self.is_expired() {
            Err(CatalogError::DeadlineExceeded)
        } else {
            Ok(())
        }
    }

    /// Run `fut` to completion or until the deadline, whichever comes first
    pub async fn run<F, T>(&self, fut: F) -> CatalogResult<T>
    where
        F: Future<Output = CatalogResult<T>>,
    {
        self.check()?;

        match self.0 {
            None => fut.await,
            Some(at) => tokio::time::timeout_at(at, fut)
                .await
                .map_err(|_| CatalogError::DeadlineExceeded)?,
        }
    }
}

/// Entry point for the five verification operations
#[derive(Clone)]
pub struct VerificationService {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobBackend>,
    policy: Arc<VerificationPolicy>,
    deadline: Deadline,
}

impl VerificationService {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobBackend>,
        policy: VerificationPolicy,
    ) -> Self {
        Self {
            metadata,
            blobs,
            policy: Arc::new(policy),
            deadline: Deadline::none(),
        }
    }

    /// Same service, bounded by `deadline`
    pub fn with_deadline(&self, deadline: Deadline) -> Self {
        Self {
            deadline,
            ..self.clone()
        }
    }

    pub fn policy(&self) -> &VerificationPolicy {
        &self.policy
    }

    fn evaluator(&self) -> IntegrityEvaluator<'_> {
        IntegrityEvaluator::new(self.blobs.as_ref(), self.policy.min_original_size)
    }

    /// Integrity verdict for a stored record, `None` if there is no record
    pub async fn check_integrity(&self, id: &str) -> CatalogResult<Option<IntegrityVerdict>> {
        self.deadline
            .run(async {
                let Some(record) = self.metadata.get_by_id(id).await? else {
                    return Ok(None);
                };

                Ok(Some(self.evaluator().evaluate(&record).await))
            })
            .await
    }

    /// Integrity verdict for a record the caller already holds
    pub async fn evaluate(&self, record: &PhotoRecord) -> CatalogResult<IntegrityVerdict> {
        self.deadline
            .run(async { Ok(self.evaluator().evaluate(record).await) })
            .await
    }

    /// Existence of an identifier across both stores
    pub async fn exists(&self, id: &str) -> CatalogResult<ExistenceStatus> {
        let reconciler =
            ExistenceReconciler::new(self.blobs.as_ref(), self.metadata.as_ref(), &self.policy);

        self.deadline.run(reconciler.exists(id)).await
    }

    /// File verification for one identifier
    pub async fn verify_files(&self, id: &str) -> CatalogResult<FileCheck> {
        let verifier = BatchVerifier::new(self.blobs.as_ref(), self.metadata.as_ref(), &self.policy);

        self.deadline.run(verifier.verify_one(id)).await
    }

    /// File verification for up to `batch_limit` identifiers
    pub async fn verify_batch(&self, ids: &[String]) -> CatalogResult<BatchSummary> {
        let verifier = BatchVerifier::new(self.blobs.as_ref(), self.metadata.as_ref(), &self.policy);

        self.deadline.run(verifier.verify_batch(ids)).await
    }

    /// Photo count reconciled between the blob listing and the catalog
    pub async fn reconcile_count(&self) -> CatalogResult<CollectionCount> {
        let counter =
            CollectionCounter::new(self.blobs.as_ref(), self.metadata.as_ref(), &self.policy);

        self.deadline.run(counter.reconcile_count()).await
    }

    /// Delete every record and up to `purge_cap` blobs
    ///
    /// The caller is responsible for authorizing this.
    pub async fn purge_all(&self) -> PurgeReport {
        BoundedPurger::new(
            self.blobs.as_ref(),
            self.metadata.as_ref(),
            &self.policy,
            self.deadline,
        )
        .purge_all()
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conventional_photo_path() {
        let policy = VerificationPolicy::default();
        assert_eq!(policy.conventional_photo_path("ABC-123"), "photos/ABC-123.jpg");
    }

    #[test]
    fn test_photo_id_from_key() {
        let policy = VerificationPolicy::default();

        assert_eq!(policy.photo_id_from_key("photos/ABC.jpg"), Some("ABC"));
        assert_eq!(policy.photo_id_from_key("photos/ABC.large.jpg"), Some("ABC"));
        assert_eq!(policy.photo_id_from_key("photos/noext"), Some("noext"));
        assert_eq!(policy.photo_id_from_key("photos/.hidden"), None);
        assert_eq!(policy.photo_id_from_key("thumbnails/ABC.jpg"), None);
    }

    #[test]
    fn test_policy_validation() {
        assert!(VerificationPolicy::default().validate().is_ok());

        let policy = VerificationPolicy {
            batch_concurrency: 0,
            ..Default::default()
        };
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("batch_concurrency"));
    }

    #[tokio::test]
    async fn test_expired_deadline_fails_fast() {
        let deadline = Deadline::at(Instant::now() - Duration::from_secs(1));
        assert!(deadline.is_expired());

        let mut polled = false;
        let result = deadline
            .run(async {
                polled = true;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(CatalogError::DeadlineExceeded)));
        assert!(!polled);
    }

    #[tokio::test]
    async fn test_deadline_interrupts_slow_work() {
        let deadline = Deadline::after(Duration::from_millis(10));

        let result = deadline
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(CatalogError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_never_expires() {
        let deadline = Deadline::after(Duration::from_secs(u64::MAX));

        assert_eq!(deadline, Deadline::none());
        assert!(deadline.check().is_ok());
        assert_eq!(deadline.run(async { Ok(1) }).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_no_deadline_runs_to_completion() {
        let value = Deadline::none().run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
