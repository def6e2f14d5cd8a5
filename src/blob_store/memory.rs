/// In-process blob storage backend
use crate::{
    blob_store::{guess_content_type, validate_key, BlobBackend, BlobHead, BlobObject, ListOptions, ListPage},
    error::CatalogResult,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct MemoryBlob {
    data: Vec<u8>,
    content_type: Option<String>,
}

/// Ordered in-memory map of blobs
///
/// Contents are lost on restart. Used for ephemeral deployments and tests.
#[derive(Default)]
pub struct MemoryBlobBackend {
    blobs: RwLock<BTreeMap<String, MemoryBlob>>,
}

impl MemoryBlobBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobBackend for MemoryBlobBackend {
    async fn head(&self, key: &str) -> CatalogResult<Option<BlobHead>> {
        let blobs = self.blobs.read().await;

        Ok(blobs.get(key).map(|blob| BlobHead {
            size: blob.data.len() as u64,
            content_type: blob
                .content_type
                .clone()
                .or_else(|| Some(guess_content_type(key).to_string())),
        }))
    }

    async fn get(&self, key: &str) -> CatalogResult<Option<Vec<u8>>> {
        Ok(self.blobs.read().await.get(key).map(|blob| blob.data.clone()))
    }

    async fn put(&self, key: &str, data: Vec<u8>, content_type: Option<&str>) -> CatalogResult<()> {
        validate_key(key)?;

        self.blobs.write().await.insert(
            key.to_string(),
            MemoryBlob {
                data,
                content_type: content_type.map(String::from),
            },
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> CatalogResult<()> {
        self.blobs.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, options: &ListOptions) -> CatalogResult<ListPage> {
        let blobs = self.blobs.read().await;

        let objects = blobs.iter().map(|(key, blob)| BlobObject {
            key: key.clone(),
            size: blob.data.len() as u64,
        });

        Ok(ListPage::from_sorted(objects, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_head_get_delete() {
        let backend = MemoryBlobBackend::new();

        backend
            .put("photos/a.png", vec![1, 2, 3], Some("image/png"))
            .await
            .unwrap();

        let head = backend.head("photos/a.png").await.unwrap().unwrap();
        assert_eq!(head.size, 3);
        assert_eq!(head.content_type.as_deref(), Some("image/png"));
        assert_eq!(backend.get("photos/a.png").await.unwrap(), Some(vec![1, 2, 3]));

        backend.delete("photos/a.png").await.unwrap();
        assert!(backend.head("photos/a.png").await.unwrap().is_none());
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_list_survives_deletes_between_pages() {
        let backend = MemoryBlobBackend::new();
        for i in 0..5 {
            backend
                .put(&format!("photos/{}.jpg", i), vec![0], None)
                .await
                .unwrap();
        }

        let first = backend.list(&ListOptions::new(2)).await.unwrap();
        for object in &first.objects {
            backend.delete(&object.key).await.unwrap();
        }

        let second = backend
            .list(&ListOptions::new(2).with_cursor(first.cursor.clone()))
            .await
            .unwrap();
        let keys: Vec<_> = second.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["photos/2.jpg", "photos/3.jpg"]);
        assert_eq!(backend.len().await, 3);
    }
}
