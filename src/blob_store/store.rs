/// Blob Store Manager
///
/// Wraps the configured backend with upload limits, key validation and the
/// content-type/ETag derivation used when serving files.
use crate::{
    blob_store::{
        disk::DiskBlobBackend, guess_content_type, memory::MemoryBlobBackend, validate_key,
        BlobBackend, StoredFile, UploadedBlob,
    },
    config::BlobstoreConfig,
    error::{CatalogError, CatalogResult},
};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Main blob store manager
#[derive(Clone)]
pub struct BlobStore {
    backend: Arc<dyn BlobBackend>,
    max_upload_size: usize,
}

impl BlobStore {
    pub fn new(backend: Arc<dyn BlobBackend>, max_upload_size: usize) -> Self {
        Self {
            backend,
            max_upload_size,
        }
    }

    /// Create a blob store for the configured backend
    pub fn from_config(config: &BlobstoreConfig, max_upload_size: usize) -> Self {
        let backend: Arc<dyn BlobBackend> = match config {
            BlobstoreConfig::Disk { location } => {
                tracing::info!(location = %location.display(), "Using disk blob storage");
                Arc::new(DiskBlobBackend::new(location.clone()))
            }
            BlobstoreConfig::Memory => {
                tracing::warn!("Using in-memory blob storage; contents are lost on restart");
                Arc::new(MemoryBlobBackend::new())
            }
        };

        Self::new(backend, max_upload_size)
    }

    /// Shared handle to the underlying backend
    pub fn backend(&self) -> Arc<dyn BlobBackend> {
        Arc::clone(&self.backend)
    }

    /// Store uploaded content under a caller-chosen key
    pub async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> CatalogResult<UploadedBlob> {
        validate_key(key)?;

        if data.len() > self.max_upload_size {
            return Err(CatalogError::Validation(format!(
                "Upload of {} bytes exceeds maximum of {} bytes",
                data.len(),
                self.max_upload_size
            )));
        }

        let content_type = content_type
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| guess_content_type(key))
            .to_string();
        let size = data.len() as u64;

        self.backend.put(key, data, Some(&content_type)).await?;

        tracing::info!(key, size, content_type = %content_type, "Stored blob");

        Ok(UploadedBlob {
            success: true,
            path: key.to_string(),
            size,
            content_type,
        })
    }

    /// Read a blob for serving
    pub async fn fetch(&self, key: &str) -> CatalogResult<Option<StoredFile>> {
        validate_key(key)?;

        let Some(data) = self.backend.get(key).await? else {
            return Ok(None);
        };

        let content_type = match self.backend.head(key).await {
            Ok(Some(head)) => head.content_type,
            _ => None,
        }
        .unwrap_or_else(|| guess_content_type(key).to_string());

        let etag = Self::calculate_etag(&data);

        Ok(Some(StoredFile {
            data,
            content_type,
            etag,
        }))
    }

    /// Delete several blobs, logging failures instead of stopping
    ///
    /// Returns the number of keys deleted.
    pub async fn delete_all_of(&self, keys: &[&str]) -> usize {
        let mut deleted = 0;

        for key in keys {
            match self.backend.delete(key).await {
                Ok(()) => deleted += 1,
                Err(e) => tracing::warn!(key, error = %e, "Failed to delete blob"),
            }
        }

        deleted
    }

    /// Quoted strong ETag over the content
    fn calculate_etag(data: &[u8]) -> String {
        let hash = Sha256::digest(data);
        format!("\"{}\"", hex::encode(hash))
    }
}
