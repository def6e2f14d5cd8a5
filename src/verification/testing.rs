/// Test doubles shared by the verification unit tests

use crate::{
    blob_store::{BlobBackend, BlobHead, ListOptions, ListPage, MemoryBlobBackend},
    catalog::MetadataStore,
    db::photo::{AssetRole, PhotoRecord},
    error::{CatalogError, CatalogResult},
};
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

/// Record with conventional asset paths for `id`
pub(crate) fn photo(id: &str) -> PhotoRecord {
    PhotoRecord {
        id: id.to_string(),
        title: format!("Photo {}", id),
        path: format!("photos/{}.jpg", id),
        thumbnail_path100: format!("thumbnails/100/{}.jpg", id),
        thumbnail_path350: format!("thumbnails/350/{}.jpg", id),
        ..Default::default()
    }
}

/// Upload all three assets of `record`, the original with `original_size` bytes
pub(crate) async fn store_assets(backend: &dyn BlobBackend, record: &PhotoRecord, original_size: u64) {
    for role in AssetRole::ALL {
        let Some(path) = record.asset_path(role) else {
            continue;
        };
        let size = if role == AssetRole::Original {
            original_size as usize
        } else {
            500
        };
        backend.put(path, vec![0u8; size], None).await.unwrap();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListMode {
    Normal,
    Fail,
    /// Always hands back the same cursor
    Stuck,
}

/// Memory backend with injectable failures and call counters
pub(crate) struct FlakyBlobBackend {
    inner: MemoryBlobBackend,
    failing_heads: HashSet<String>,
    list_mode: ListMode,
    deletes_before_failure: Option<usize>,
    head_calls: AtomicUsize,
    list_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl FlakyBlobBackend {
    pub(crate) fn new() -> Self {
        Self {
            inner: MemoryBlobBackend::new(),
            failing_heads: HashSet::new(),
            list_mode: ListMode::Normal,
            deletes_before_failure: None,
            head_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing_head(mut self, key: &str) -> Self {
        self.failing_heads.insert(key.to_string());
        self
    }

    pub(crate) fn failing_list(mut self) -> Self {
        self.list_mode = ListMode::Fail;
        self
    }

    pub(crate) fn stuck_cursor(mut self) -> Self {
        self.list_mode = ListMode::Stuck;
        self
    }

    /// Deletes succeed `count` times, then every later delete fails
    pub(crate) fn failing_deletes_after(mut self, count: usize) -> Self {
        self.deletes_before_failure = Some(count);
        self
    }

    pub(crate) async fn put_blob(&self, key: &str, size: usize) {
        self.inner.put(key, vec![0u8; size], None).await.unwrap();
    }

    pub(crate) async fn remove(&self, key: &str) {
        self.inner.delete(key).await.unwrap();
    }

    pub(crate) async fn len(&self) -> usize {
        self.inner.len().await
    }

    pub(crate) fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobBackend for FlakyBlobBackend {
    async fn head(&self, key: &str) -> CatalogResult<Option<BlobHead>> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_heads.contains(key) {
            return Err(CatalogError::BlobStorage(format!("injected failure probing {}", key)));
        }

        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> CatalogResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Vec<u8>, content_type: Option<&str>) -> CatalogResult<()> {
        self.inner.put(key, data, content_type).await
    }

    async fn delete(&self, key: &str) -> CatalogResult<()> {
        let attempt = self.delete_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(limit) = self.deletes_before_failure {
            if attempt >= limit {
                return Err(CatalogError::BlobStorage(format!("injected failure deleting {}", key)));
            }
        }

        self.inner.delete(key).await
    }

    async fn list(&self, options: &ListOptions) -> CatalogResult<ListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        match self.list_mode {
            ListMode::Normal => self.inner.list(options).await,
            ListMode::Fail => Err(CatalogError::BlobStorage("injected listing failure".to_string())),
            ListMode::Stuck => {
                let mut page = self.inner.list(&ListOptions {
                    cursor: None,
                    ..options.clone()
                })
                .await?;
                page.cursor = Some("stuck".to_string());
                Ok(page)
            }
        }
    }
}

/// Map-backed metadata store with injectable failures
#[derive(Default)]
pub(crate) struct StubCatalog {
    records: Mutex<BTreeMap<String, PhotoRecord>>,
    failing_ids: HashSet<String>,
    unreachable: bool,
    lookups: AtomicUsize,
}

impl StubCatalog {
    pub(crate) fn with_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = PhotoRecord>,
    {
        Self {
            records: Mutex::new(records.into_iter().map(|r| (r.id.clone(), r)).collect()),
            ..Default::default()
        }
    }

    /// Every call fails
    pub(crate) fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    pub(crate) fn failing_lookup(mut self, id: &str) -> Self {
        self.failing_ids.insert(id.to_string());
        self
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn guard(&self) -> CatalogResult<()> {
        if self.unreachable {
            Err(CatalogError::Internal("injected catalog failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MetadataStore for StubCatalog {
    async fn get_by_id(&self, id: &str) -> CatalogResult<Option<PhotoRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.guard()?;

        if self.failing_ids.contains(id) {
            return Err(CatalogError::Internal(format!("injected lookup failure for {}", id)));
        }

        Ok(self.records.lock().unwrap().get(id).cloned())
    }

    async fn count(&self) -> CatalogResult<u64> {
        self.guard()?;
        Ok(self.records.lock().unwrap().len() as u64)
    }

    async fn delete_by_id(&self, id: &str) -> CatalogResult<bool> {
        self.guard()?;
        Ok(self.records.lock().unwrap().remove(id).is_some())
    }

    async fn delete_all(&self) -> CatalogResult<u64> {
        self.guard()?;
        let mut records = self.records.lock().unwrap();
        let deleted = records.len() as u64;
        records.clear();
        Ok(deleted)
    }
}
