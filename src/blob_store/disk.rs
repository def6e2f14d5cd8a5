/// Disk-based blob storage backend
use crate::{
    blob_store::{guess_content_type, validate_key, BlobBackend, BlobHead, BlobObject, ListOptions, ListPage},
    error::{CatalogError, CatalogResult},
};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Disk storage backend
///
/// Stores each blob as a file at `{base}/{key}`, so `photos/a.jpg` lands in
/// a `photos` subdirectory. Listing walks the tree and sorts keys, which
/// keeps cursors stable while objects are deleted between pages.
#[derive(Clone)]
pub struct DiskBlobBackend {
    base_path: PathBuf,
}

impl DiskBlobBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the file path for a key
    fn get_blob_path(&self, key: &str) -> CatalogResult<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }

    /// Directory holding every key under `prefix`, limited to the base tree
    fn scan_root(base_path: &Path, prefix: &str) -> PathBuf {
        let Some(split) = prefix.rfind('/') else {
            return base_path.to_path_buf();
        };

        let dir = Path::new(&prefix[..split]);
        if dir.components().all(|c| matches!(c, Component::Normal(_))) {
            base_path.join(dir)
        } else {
            base_path.to_path_buf()
        }
    }

    /// Stored objects under `prefix` and after `after`, sorted by key
    ///
    /// Only the prefix's directory is walked, and entries outside the page
    /// window are skipped before they are stat'ed.
    fn scan(base_path: &Path, prefix: &str, after: Option<&str>) -> CatalogResult<Vec<BlobObject>> {
        let root = Self::scan_root(base_path, prefix);
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut objects = Vec::new();
        for entry in WalkDir::new(&root).follow_links(false) {
            let entry = entry
                .map_err(|e| CatalogError::BlobStorage(format!("Failed to walk blob directory: {}", e)))?;

            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(base_path) else {
                continue;
            };

            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if !key.starts_with(prefix) || after.map_or(false, |cursor| key.as_str() <= cursor) {
                continue;
            }

            let size = entry
                .metadata()
                .map_err(|e| CatalogError::BlobStorage(format!("Failed to stat blob {}: {}", key, e)))?
                .len();

            objects.push(BlobObject { key, size });
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}

#[async_trait]
impl BlobBackend for DiskBlobBackend {
    async fn head(&self, key: &str) -> CatalogResult<Option<BlobHead>> {
        let blob_path = self.get_blob_path(key)?;

        match fs::metadata(&blob_path).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(BlobHead {
                size: metadata.len(),
                content_type: Some(guess_content_type(key).to_string()),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CatalogError::BlobStorage(format!(
                "Failed to probe blob {}: {}",
                key, e
            ))),
        }
    }

    async fn get(&self, key: &str) -> CatalogResult<Option<Vec<u8>>> {
        let blob_path = self.get_blob_path(key)?;

        match fs::read(&blob_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CatalogError::BlobStorage(format!(
                "Failed to read blob {}: {}",
                key, e
            ))),
        }
    }

    async fn put(&self, key: &str, data: Vec<u8>, _content_type: Option<&str>) -> CatalogResult<()> {
        let blob_path = self.get_blob_path(key)?;

        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                CatalogError::BlobStorage(format!("Failed to create blob directory: {}", e))
            })?;
        }

        fs::write(&blob_path, data).await.map_err(|e| {
            CatalogError::BlobStorage(format!("Failed to write blob {}: {}", key, e))
        })?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> CatalogResult<()> {
        let blob_path = self.get_blob_path(key)?;

        match fs::remove_file(&blob_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CatalogError::BlobStorage(format!(
                "Failed to delete blob {}: {}",
                key, e
            ))),
        }
    }

    async fn list(&self, options: &ListOptions) -> CatalogResult<ListPage> {
        let base_path = self.base_path.clone();
        let prefix = options.prefix.clone().unwrap_or_default();
        let after = options.cursor.clone().filter(|c| !c.is_empty());

        let objects = tokio::task::spawn_blocking(move || Self::scan(&base_path, &prefix, after.as_deref()))
            .await
            .map_err(|e| CatalogError::Internal(format!("Blob listing task failed: {}", e)))??;

        Ok(ListPage::from_sorted(objects, options))
    }
}
