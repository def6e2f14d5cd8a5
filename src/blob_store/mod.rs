/// Blob Storage System
///
/// Holds the original images and thumbnails, addressed by path-like keys
/// such as `photos/{id}.jpg`. Supports multiple backend implementations.

pub mod disk;
pub mod memory;
pub mod models;
pub mod store;

pub use disk::DiskBlobBackend;
pub use memory::MemoryBlobBackend;
pub use models::*;
pub use store::BlobStore;

use crate::error::{CatalogError, CatalogResult};
use async_trait::async_trait;

/// Blob storage backend trait
///
/// Implementations handle the actual storage and retrieval of blob data.
/// A missing key is `Ok(None)`, never an error.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Probe a key without reading its content
    async fn head(&self, key: &str) -> CatalogResult<Option<BlobHead>>;

    /// Retrieve a blob by key
    async fn get(&self, key: &str) -> CatalogResult<Option<Vec<u8>>>;

    /// Store a blob, replacing any existing content
    async fn put(&self, key: &str, data: Vec<u8>, content_type: Option<&str>) -> CatalogResult<()>;

    /// Delete a blob; deleting a missing key succeeds
    async fn delete(&self, key: &str) -> CatalogResult<()>;

    /// List keys in ascending order, one page at a time
    async fn list(&self, options: &ListOptions) -> CatalogResult<ListPage>;
}

/// Reject keys that could escape a backend's namespace
pub fn validate_key(key: &str) -> CatalogResult<()> {
    if key.is_empty() {
        return Err(CatalogError::Validation("Blob key cannot be empty".to_string()));
    }

    if key.starts_with('/') || key.contains('\\') || key.contains('\0') {
        return Err(CatalogError::Validation(format!("Invalid blob key: {}", key)));
    }

    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(CatalogError::Validation(format!("Invalid blob key: {}", key)));
    }

    Ok(())
}

/// Content type implied by a key's extension
pub fn guess_content_type(key: &str) -> &'static str {
    let extension = key
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}
