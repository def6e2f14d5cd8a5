/// Per-record asset integrity
use crate::{
    blob_store::BlobBackend,
    db::photo::{AssetRole, PhotoRecord},
};
use serde::{Deserialize, Serialize};

/// Reason a record is not intact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    OriginalMissing,
    OriginalTooSmall,
    Thumbnail100Missing,
    Thumbnail350Missing,
}

impl IssueCode {
    fn missing(role: AssetRole) -> Self {
        match role {
            AssetRole::Original => IssueCode::OriginalMissing,
            AssetRole::Thumbnail100 => IssueCode::Thumbnail100Missing,
            AssetRole::Thumbnail350 => IssueCode::Thumbnail350Missing,
        }
    }
}

/// Observed state of one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetStatus {
    /// Whether the record carries a path for this asset at all
    pub referenced: bool,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Probe failure, reported verbatim; the asset counts as absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AssetStatus {
    pub fn unreferenced() -> Self {
        Self {
            referenced: false,
            exists: false,
            size: None,
            error: None,
        }
    }

    pub fn present(size: u64) -> Self {
        Self {
            referenced: true,
            exists: true,
            size: Some(size),
            error: None,
        }
    }

    pub fn absent() -> Self {
        Self {
            referenced: true,
            exists: false,
            size: None,
            error: None,
        }
    }

    pub fn probe_failed(error: impl Into<String>) -> Self {
        Self {
            referenced: true,
            exists: false,
            size: None,
            error: Some(error.into()),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.referenced && !self.exists
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityFiles {
    pub original: AssetStatus,
    pub thumbnail100: AssetStatus,
    pub thumbnail350: AssetStatus,
}

impl IntegrityFiles {
    pub fn get(&self, role: AssetRole) -> &AssetStatus {
        match role {
            AssetRole::Original => &self.original,
            AssetRole::Thumbnail100 => &self.thumbnail100,
            AssetRole::Thumbnail350 => &self.thumbnail350,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityVerdict {
    pub is_intact: bool,
    pub issues: Vec<IssueCode>,
    pub files: IntegrityFiles,
}

impl IntegrityVerdict {
    /// Derive issues and intactness from observed asset states
    ///
    /// Intact requires an original of at least `min_original_size` bytes and
    /// both thumbnails. Unset paths raise no issue but still break
    /// intactness.
    pub fn assess(files: IntegrityFiles, min_original_size: u64) -> Self {
        let original = &files.original;
        let original_ok = original.exists && original.size.unwrap_or(0) >= min_original_size;

        let issues = AssetRole::ALL
            .iter()
            .filter_map(|role| {
                let status = files.get(*role);
                if status.is_missing() {
                    Some(IssueCode::missing(*role))
                } else if *role == AssetRole::Original && status.exists && !original_ok {
                    Some(IssueCode::OriginalTooSmall)
                } else {
                    None
                }
            })
            .collect();

        let is_intact = original_ok && files.thumbnail100.exists && files.thumbnail350.exists;

        Self {
            is_intact,
            issues,
            files,
        }
    }
}

/// Probes a record's assets and judges intactness
pub struct IntegrityEvaluator<'a> {
    blobs: &'a dyn BlobBackend,
    min_original_size: u64,
}

impl<'a> IntegrityEvaluator<'a> {
    pub fn new(blobs: &'a dyn BlobBackend, min_original_size: u64) -> Self {
        Self {
            blobs,
            min_original_size,
        }
    }

    /// Single head probe; errors are folded into an absent status
    pub async fn probe(&self, path: Option<&str>) -> AssetStatus {
        let Some(path) = path else {
            return AssetStatus::unreferenced();
        };

        match self.blobs.head(path).await {
            Ok(Some(head)) => AssetStatus::present(head.size),
            Ok(None) => {
                tracing::debug!(path, "Asset missing from blob store");
                AssetStatus::absent()
            }
            Err(e) => {
                tracing::warn!(path, error = %e, "Asset probe failed; treating as missing");
                AssetStatus::probe_failed(e.to_string())
            }
        }
    }

    pub async fn evaluate(&self, record: &PhotoRecord) -> IntegrityVerdict {
        let (original, thumbnail100, thumbnail350) = tokio::join!(
            self.probe(record.asset_path(AssetRole::Original)),
            self.probe(record.asset_path(AssetRole::Thumbnail100)),
            self.probe(record.asset_path(AssetRole::Thumbnail350)),
        );

        let verdict = IntegrityVerdict::assess(
            IntegrityFiles {
                original,
                thumbnail100,
                thumbnail350,
            },
            self.min_original_size,
        );

        tracing::debug!(
            id = %record.id,
            is_intact = verdict.is_intact,
            issues = verdict.issues.len(),
            "Evaluated photo integrity"
        );

        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::testing::{photo, store_assets, FlakyBlobBackend};
    use crate::verification::MIN_ORIGINAL_SIZE;

    async fn verdict_for(backend: &FlakyBlobBackend, record: &PhotoRecord) -> IntegrityVerdict {
        IntegrityEvaluator::new(backend, MIN_ORIGINAL_SIZE)
            .evaluate(record)
            .await
    }

    #[tokio::test]
    async fn test_all_assets_present_is_intact() {
        let backend = FlakyBlobBackend::new();
        let record = photo("a");
        store_assets(&backend, &record, 20_000).await;

        let verdict = verdict_for(&backend, &record).await;

        assert!(verdict.is_intact);
        assert!(verdict.issues.is_empty());
        assert_eq!(verdict.files.original.size, Some(20_000));
    }

    #[tokio::test]
    async fn test_each_missing_asset_has_its_issue() {
        let cases = [
            (AssetRole::Original, IssueCode::OriginalMissing),
            (AssetRole::Thumbnail100, IssueCode::Thumbnail100Missing),
            (AssetRole::Thumbnail350, IssueCode::Thumbnail350Missing),
        ];

        for (role, expected) in cases {
            let backend = FlakyBlobBackend::new();
            let record = photo("a");
            store_assets(&backend, &record, 20_000).await;
            backend.remove(record.asset_path(role).unwrap()).await;

            let verdict = verdict_for(&backend, &record).await;

            assert!(!verdict.is_intact, "{:?} missing should break intactness", role);
            assert_eq!(verdict.issues, vec![expected]);
            assert!(!verdict.files.get(role).exists);
        }
    }

    #[tokio::test]
    async fn test_original_size_floor_boundary() {
        let backend = FlakyBlobBackend::new();
        let record = photo("small");
        store_assets(&backend, &record, MIN_ORIGINAL_SIZE - 1).await;

        let verdict = verdict_for(&backend, &record).await;
        assert!(!verdict.is_intact);
        assert_eq!(verdict.issues, vec![IssueCode::OriginalTooSmall]);
        assert!(verdict.files.original.exists);

        let backend = FlakyBlobBackend::new();
        let record = photo("exact");
        store_assets(&backend, &record, MIN_ORIGINAL_SIZE).await;

        let verdict = verdict_for(&backend, &record).await;
        assert!(verdict.is_intact);
        assert!(verdict.issues.is_empty());
    }

    #[tokio::test]
    async fn test_probe_failure_is_fail_closed() {
        let record = photo("a");
        let backend = FlakyBlobBackend::new().failing_head(&record.thumbnail_path100);
        store_assets(&backend, &record, 20_000).await;

        let verdict = verdict_for(&backend, &record).await;

        assert!(!verdict.is_intact);
        assert_eq!(verdict.issues, vec![IssueCode::Thumbnail100Missing]);
        let status = &verdict.files.thumbnail100;
        assert!(!status.exists);
        assert!(status.error.as_deref().unwrap().contains("injected"));
    }

    #[tokio::test]
    async fn test_unset_path_is_not_an_issue_but_not_intact() {
        let backend = FlakyBlobBackend::new();
        let mut record = photo("a");
        store_assets(&backend, &record, 20_000).await;
        record.thumbnail_path350 = String::new();

        let verdict = verdict_for(&backend, &record).await;

        assert!(verdict.issues.is_empty());
        assert!(!verdict.is_intact);
        assert!(!verdict.files.thumbnail350.referenced);
        assert_eq!(backend.head_calls(), 2);
    }

    #[tokio::test]
    async fn test_issues_follow_role_order() {
        let backend = FlakyBlobBackend::new();
        let record = photo("nothing-uploaded");

        let verdict = verdict_for(&backend, &record).await;

        assert_eq!(
            verdict.issues,
            vec![
                IssueCode::OriginalMissing,
                IssueCode::Thumbnail100Missing,
                IssueCode::Thumbnail350Missing,
            ]
        );
    }

    #[test]
    fn test_verdict_serialization() {
        let verdict = IntegrityVerdict::assess(
            IntegrityFiles {
                original: AssetStatus::present(9_999),
                thumbnail100: AssetStatus::absent(),
                thumbnail350: AssetStatus::present(10),
            },
            MIN_ORIGINAL_SIZE,
        );

        let value = serde_json::to_value(&verdict).unwrap();
        assert_eq!(value["isIntact"], false);
        assert_eq!(
            value["issues"],
            serde_json::json!(["original_too_small", "thumbnail100_missing"])
        );
        assert_eq!(value["files"]["original"]["size"], 9_999);
        assert!(value["files"]["thumbnail100"].get("size").is_none());
    }
}
