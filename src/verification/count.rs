/// Photo count reconciled between the blob listing and the catalog
use crate::{
    blob_store::{BlobBackend, ListOptions},
    catalog::MetadataStore,
    error::CatalogResult,
    verification::VerificationPolicy,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCount {
    pub reconciled_count: u64,
    /// Unique identifiers derived from keys under the photo prefix
    pub blob_derived_count: u64,
    /// Catalog row count, only present when the blob listing was empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_count: Option<u64>,
    pub total_blob_files_scanned: u64,
    pub thumbnails_directory_present: bool,
    /// False when the listing was cut short by a termination guard
    pub listing_complete: bool,
}

#[derive(Debug, Default)]
struct PhotoListing {
    ids: HashSet<String>,
    scanned: u64,
    complete: bool,
}

pub struct CollectionCounter<'a> {
    blobs: &'a dyn BlobBackend,
    metadata: &'a dyn MetadataStore,
    policy: &'a VerificationPolicy,
}

impl<'a> CollectionCounter<'a> {
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

    /// Count photos from the blob listing, falling back to the catalog
    /// only when the listing yields no identifiers at all.
    pub async fn reconcile_count(&self) -> CatalogResult<CollectionCount> {
        let listing = self.scan_photos().await?;
        let thumbnails_directory_present = self.thumbnails_present().await;
        let blob_derived_count = listing.ids.len() as u64;

        let metadata_count = if blob_derived_count == 0 {
            let count = self.metadata.count().await?;
            tracing::info!(count, "Blob listing empty; using catalog row count");
            Some(count)
        } else {
            None
        };

        Ok(CollectionCount {
            reconciled_count: metadata_count.unwrap_or(blob_derived_count),
            blob_derived_count,
            metadata_count,
            total_blob_files_scanned: listing.scanned,
            thumbnails_directory_present,
            listing_complete: listing.complete,
        })
    }

    async fn scan_photos(&self) -> CatalogResult<PhotoListing> {
        let mut listing = PhotoListing {
            complete: true,
            ..Default::default()
        };
        let mut cursor: Option<String> = None;
        let mut pages = 0;

        loop {
            if pages >= self.policy.max_list_pages {
                tracing::warn!(pages, "Photo listing exceeded page limit; count may be low");
                listing.complete = false;
                break;
            }

            let options = ListOptions::prefixed(&self.policy.photo_prefix, self.policy.count_page_size)
                .with_cursor(cursor.clone());
            let page = self.blobs.list(&options).await?;
            pages += 1;

            listing.scanned += page.objects.len() as u64;
            listing.ids.extend(
                page.objects
                    .iter()
                    .filter_map(|object| self.policy.photo_id_from_key(&object.key))
                    .map(String::from),
            );

            let Some(next) = page.next_cursor() else {
                break;
            };

            if cursor.as_deref() == Some(next) {
                tracing::warn!(cursor = next, "Blob store repeated a listing cursor; stopping");
                listing.complete = false;
                break;
            }

            cursor = Some(next.to_string());
        }

        tracing::debug!(
            pages,
            scanned = listing.scanned,
            unique = listing.ids.len(),
            "Scanned photo listing"
        );

        Ok(listing)
    }

    /// Informational only; a failed probe reports `false`
    async fn thumbnails_present(&self) -> bool {
        let options = ListOptions::prefixed(&self.policy.thumbnail_prefix, 1);

        match self.blobs.list(&options).await {
            Ok(page) => !page.objects.is_empty(),
            Err(e) => {
                tracing::warn!(error = %e, "Thumbnail listing failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::testing::{photo, FlakyBlobBackend, StubCatalog};

    fn catalog_with(rows: usize) -> StubCatalog {
        StubCatalog::with_records((0..rows).map(|i| photo(&format!("row-{}", i))))
    }

    #[tokio::test]
    async fn test_empty_listing_falls_back_to_catalog() {
        let backend = FlakyBlobBackend::new();
        let catalog = catalog_with(42);
        let policy = VerificationPolicy::default();

        let count = CollectionCounter::new(&backend, &catalog, &policy)
            .reconcile_count()
            .await
            .unwrap();

        assert_eq!(count.reconciled_count, 42);
        assert_eq!(count.metadata_count, Some(42));
        assert_eq!(count.blob_derived_count, 0);
        assert!(count.listing_complete);
    }

    #[tokio::test]
    async fn test_blob_count_wins_over_catalog() {
        let backend = FlakyBlobBackend::new();
        for i in 0..7 {
            backend.put_blob(&format!("photos/{}.jpg", i), 100).await;
        }
        let catalog = catalog_with(42);
        let policy = VerificationPolicy::default();

        let count = CollectionCounter::new(&backend, &catalog, &policy)
            .reconcile_count()
            .await
            .unwrap();

        assert_eq!(count.reconciled_count, 7);
        assert_eq!(count.metadata_count, None);
        assert_eq!(count.total_blob_files_scanned, 7);
        assert!(!count.thumbnails_directory_present);
    }

    #[tokio::test]
    async fn test_derivatives_do_not_inflate_count() {
        let backend = FlakyBlobBackend::new();
        for key in ["photos/a.jpg", "photos/a.large.jpg", "photos/b.jpg", "thumbnails/100/a.jpg"] {
            backend.put_blob(key, 100).await;
        }
        let catalog = StubCatalog::default();
        let policy = VerificationPolicy::default();

        let count = CollectionCounter::new(&backend, &catalog, &policy)
            .reconcile_count()
            .await
            .unwrap();

        assert_eq!(count.blob_derived_count, 2);
        assert_eq!(count.total_blob_files_scanned, 3);
        assert!(count.thumbnails_directory_present);
    }

    #[tokio::test]
    async fn test_follows_cursor_across_pages() {
        let backend = FlakyBlobBackend::new();
        for i in 0..25 {
            backend.put_blob(&format!("photos/{:02}.jpg", i), 100).await;
        }
        let catalog = StubCatalog::default();
        let policy = VerificationPolicy {
            count_page_size: 10,
            ..Default::default()
        };

        let count = CollectionCounter::new(&backend, &catalog, &policy)
            .reconcile_count()
            .await
            .unwrap();

        assert_eq!(count.reconciled_count, 25);
        assert!(count.listing_complete);
        // three photo pages plus the thumbnail probe
        assert_eq!(backend.list_calls(), 4);
    }

    #[tokio::test]
    async fn test_repeated_cursor_terminates() {
        let backend = FlakyBlobBackend::new().stuck_cursor();
        for i in 0..3 {
            backend.put_blob(&format!("photos/{}.jpg", i), 100).await;
        }
        let catalog = StubCatalog::default();
        let policy = VerificationPolicy::default();

        let count = CollectionCounter::new(&backend, &catalog, &policy)
            .reconcile_count()
            .await
            .unwrap();

        assert_eq!(count.blob_derived_count, 3);
        assert!(!count.listing_complete);
        assert_eq!(backend.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_page_limit_terminates() {
        let backend = FlakyBlobBackend::new();
        for i in 0..5 {
            backend.put_blob(&format!("photos/{}.jpg", i), 100).await;
        }
        let catalog = StubCatalog::default();
        let policy = VerificationPolicy {
            count_page_size: 1,
            max_list_pages: 2,
            ..Default::default()
        };

        let count = CollectionCounter::new(&backend, &catalog, &policy)
            .reconcile_count()
            .await
            .unwrap();

        assert_eq!(count.total_blob_files_scanned, 2);
        assert!(!count.listing_complete);
    }

    #[tokio::test]
    async fn test_listing_failure_is_an_error() {
        let backend = FlakyBlobBackend::new().failing_list();
        let catalog = catalog_with(3);
        let policy = VerificationPolicy::default();

        let result = CollectionCounter::new(&backend, &catalog, &policy)
            .reconcile_count()
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fallback_count_failure_is_an_error() {
        let backend = FlakyBlobBackend::new();
        let catalog = StubCatalog::unreachable();
        let policy = VerificationPolicy::default();

        let result = CollectionCounter::new(&backend, &catalog, &policy)
            .reconcile_count()
            .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_count_serialization() {
        let count = CollectionCount {
            reconciled_count: 7,
            blob_derived_count: 7,
            metadata_count: None,
            total_blob_files_scanned: 9,
            thumbnails_directory_present: true,
            listing_complete: true,
        };

        let value = serde_json::to_value(&count).unwrap();
        assert_eq!(value["reconciledCount"], 7);
        assert_eq!(value["totalBlobFilesScanned"], 9);
        assert!(value.get("metadataCount").is_none());
    }
}
