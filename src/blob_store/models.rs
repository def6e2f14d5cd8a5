/// Blob storage data models
use serde::{Deserialize, Serialize};

/// Result of a successful head probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobHead {
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// One entry of a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobObject {
    pub key: String,
    pub size: u64,
}

/// Listing request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only keys starting with this prefix
    pub prefix: Option<String>,
    /// Maximum objects per page
    pub limit: usize,
    /// Continuation cursor from a previous page
    pub cursor: Option<String>,
}

impl ListOptions {
    pub fn new(limit: usize) -> Self {
        Self {
            prefix: None,
            limit,
            cursor: None,
        }
    }

    pub fn prefixed(prefix: impl Into<String>, limit: usize) -> Self {
        Self {
            prefix: Some(prefix.into()),
            limit,
            cursor: None,
        }
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }
}

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub objects: Vec<BlobObject>,
    pub cursor: Option<String>,
}

impl ListPage {
    /// Cursor for the next page; an empty-string cursor counts as exhausted
    pub fn next_cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.is_empty())
    }

    /// Paginate an ordered key space
    ///
    /// `objects` must be sorted by key. The cursor is the last key of the
    /// returned page and is only set when more matching keys remain, so
    /// deleting already-listed keys between calls never skips anything.
    pub fn from_sorted<I>(objects: I, options: &ListOptions) -> Self
    where
        I: IntoIterator<Item = BlobObject>,
    {
        let limit = options.limit.max(1);
        let prefix = options.prefix.as_deref().unwrap_or("");
        let after = options.cursor.as_deref().filter(|c| !c.is_empty());

        let mut matching = objects
            .into_iter()
            .filter(|o| o.key.starts_with(prefix))
            .filter(|o| after.map_or(true, |cursor| o.key.as_str() > cursor));

        let page: Vec<BlobObject> = matching.by_ref().take(limit).collect();
        let has_more = matching.next().is_some();

        let cursor = if has_more {
            page.last().map(|o| o.key.clone())
        } else {
            None
        };

        Self {
            objects: page,
            cursor,
        }
    }
}

/// Blob content as served to clients
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub data: Vec<u8>,
    pub content_type: String,
    pub etag: String,
}

/// Upload acknowledgement
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedBlob {
    pub success: bool,
    pub path: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
}
