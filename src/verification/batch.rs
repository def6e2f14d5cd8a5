/// Batch file verification
///
/// Each identifier is checked independently: a failed lookup for one id is
/// attached to that id's result and the rest of the batch carries on.
use crate::{
    blob_store::BlobBackend,
    catalog::MetadataStore,
    db::photo::{AssetRole, PhotoRecord},
    error::{CatalogError, CatalogResult},
    verification::{IntegrityEvaluator, IntegrityFiles, VerificationPolicy},
};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

/// Reason reported for identifiers with no catalog record
pub const NOT_IN_DATABASE: &str = "photo_not_in_database";

/// File verification result for one identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCheck {
    pub id: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub original: bool,
    pub thumbnail100: bool,
    pub thumbnail350: bool,
    pub missing_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileCheck {
    pub fn not_in_database(id: &str) -> Self {
        Self {
            id: id.to_string(),
            exists: false,
            reason: Some(NOT_IN_DATABASE.to_string()),
            original: false,
            thumbnail100: false,
            thumbnail350: false,
            missing_files: Vec::new(),
            error: None,
        }
    }

    pub fn lookup_failed(id: &str, error: impl Into<String>) -> Self {
        Self {
            reason: None,
            error: Some(error.into()),
            ..Self::not_in_database(id)
        }
    }

    /// Summarise probed assets; `exists` is false iff a referenced asset is missing
    pub fn from_files(record: &PhotoRecord, files: &IntegrityFiles) -> Self {
        let missing_files: Vec<String> = AssetRole::ALL
            .iter()
            .filter(|role| files.get(**role).is_missing())
            .filter_map(|role| record.asset_path(*role))
            .map(String::from)
            .collect();

        let probe_errors: Vec<&str> = AssetRole::ALL
            .iter()
            .filter_map(|role| files.get(*role).error.as_deref())
            .collect();

        Self {
            id: record.id.clone(),
            exists: missing_files.is_empty(),
            reason: None,
            original: files.original.exists,
            thumbnail100: files.thumbnail100.exists,
            thumbnail350: files.thumbnail350.exists,
            missing_files,
            error: if probe_errors.is_empty() {
                None
            } else {
                Some(probe_errors.join("; "))
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTally {
    pub success: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub results: Vec<FileCheck>,
    pub summary: BatchTally,
}

impl BatchSummary {
    pub fn from_results(results: Vec<FileCheck>) -> Self {
        let success = results.iter().filter(|r| r.exists).count();

        Self {
            total: results.len(),
            summary: BatchTally {
                success,
                failed: results.len() - success,
            },
            results,
        }
    }
}

pub struct BatchVerifier<'a> {
    blobs: &'a dyn BlobBackend,
    metadata: &'a dyn MetadataStore,
    policy: &'a VerificationPolicy,
}

impl<'a> BatchVerifier<'a> {
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

    /// Verify one identifier; a lookup error fails the call
    pub async fn verify_one(&self, id: &str) -> CatalogResult<FileCheck> {
        let Some(record) = self.metadata.get_by_id(id).await? else {
            return Ok(FileCheck::not_in_database(id));
        };

        let verdict = IntegrityEvaluator::new(self.blobs, self.policy.min_original_size)
            .evaluate(&record)
            .await;

        Ok(FileCheck::from_files(&record, &verdict.files))
    }

    /// Verify up to `batch_limit` identifiers, preserving input order
    pub async fn verify_batch(&self, ids: &[String]) -> CatalogResult<BatchSummary> {
        if ids.is_empty() {
            return Err(CatalogError::Validation(
                "ids should be a non-empty array".to_string(),
            ));
        }

        let limit = self.policy.batch_limit.max(1);
        if ids.len() > limit {
            tracing::debug!(requested = ids.len(), limit, "Truncating batch verification request");
        }
        let ids = &ids[..ids.len().min(limit)];

        let results: Vec<FileCheck> = stream::iter(ids.to_vec())
            .map(|id| async move {
                let id = id.as_str();
                match self.verify_one(id).await {
                    Ok(check) => check,
                    Err(e) => {
                        tracing::warn!(id = %id, error = %e, "Photo lookup failed during batch verification");
                        FileCheck::lookup_failed(id, e.to_string())
                    }
                }
            })
            .buffered(self.policy.batch_concurrency.max(1))
            .collect()
            .await;

        let summary = BatchSummary::from_results(results);

        tracing::info!(
            total = summary.total,
            success = summary.summary.success,
            failed = summary.summary.failed,
            "Batch verification finished"
        );

        Ok(summary)
    }
}
