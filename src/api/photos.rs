/// Photo record endpoints
use crate::{
    catalog::MetadataStore,
    context::AppContext,
    db::photo::PhotoRecord,
    error::{CatalogError, CatalogResult},
    verification::ExistenceStatus,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Header set on `HEAD /api/photos/:id` when the record has lost its original
pub const FILES_MISSING_HEADER: &str = "x-photo-files-missing";

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 1_000;

/// Build photo routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/photos", get(list_photos).post(add_photo))
        .route("/api/photos/count", get(count_photos))
        .route(
            "/api/photos/:id",
            get(get_photo)
                .head(photo_exists)
                .put(update_photo)
                .delete(delete_photo),
        )
        .route("/api/sync", post(sync_photos))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SyncError {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SyncResult {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<SyncError>,
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> CatalogResult<T> {
    body.map(|Json(value)| value)
        .map_err(|e| CatalogError::Validation(format!("Invalid request body: {}", e.body_text())))
}

fn require_fields(record: &PhotoRecord) -> CatalogResult<()> {
    let missing: Vec<&str> = [
        ("id", record.id.as_str()),
        ("title", record.title.as_str()),
        ("path", record.path.as_str()),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(name, _)| name)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

async fn list_photos(
    State(ctx): State<AppContext>,
    Query(query): Query<ListQuery>,
) -> CatalogResult<Json<Vec<PhotoRecord>>> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    Ok(Json(ctx.catalog.list(limit, offset).await?))
}

async fn add_photo(
    State(ctx): State<AppContext>,
    body: Result<Json<PhotoRecord>, JsonRejection>,
) -> CatalogResult<impl IntoResponse> {
    let record = parse_body(body)?;
    require_fields(&record)?;

    ctx.catalog.insert(&record).await?;

    tracing::info!(id = %record.id, "Photo added");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "id": record.id })),
    ))
}

async fn count_photos(State(ctx): State<AppContext>) -> CatalogResult<Json<serde_json::Value>> {
    let count = ctx.catalog.count().await?;
    Ok(Json(json!({ "count": count })))
}

async fn get_photo(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> CatalogResult<Json<PhotoRecord>> {
    ctx.catalog
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| CatalogError::NotFound(format!("Photo not found: {}", id)))
}

/// Existence probe: 200 found, 204 when only the record remains, 404 otherwise
async fn photo_exists(State(ctx): State<AppContext>, Path(id): Path<String>) -> Response {
    match ctx.verifier().exists(&id).await {
        Ok(ExistenceStatus::Found) => StatusCode::OK.into_response(),
        Ok(ExistenceStatus::MetadataOnly) => (
            StatusCode::NO_CONTENT,
            [(
                HeaderName::from_static(FILES_MISSING_HEADER),
                HeaderValue::from_static("true"),
            )],
        )
            .into_response(),
        Ok(ExistenceStatus::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn update_photo(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    body: Result<Json<PhotoRecord>, JsonRejection>,
) -> CatalogResult<Json<serde_json::Value>> {
    let record = parse_body(body)?;

    if !ctx.catalog.update(&id, &record).await? {
        return Err(CatalogError::NotFound(format!("Photo not found: {}", id)));
    }

    tracing::info!(id = %id, "Photo updated");

    Ok(Json(json!({ "success": true, "id": id })))
}

/// Delete the referenced blobs, then the record
///
/// Blob deletion failures are logged and do not keep the record alive.
async fn delete_photo(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> CatalogResult<Json<serde_json::Value>> {
    let record = ctx
        .catalog
        .get_by_id(&id)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("Photo not found: {}", id)))?;

    let paths = record.referenced_paths();
    let blobs_deleted = ctx.blob_store.delete_all_of(&paths).await;

    ctx.catalog.delete_by_id(&id).await?;

    tracing::info!(id = %id, blobs_deleted, "Photo deleted");

    Ok(Json(json!({
        "success": true,
        "id": id,
        "filesDeleted": blobs_deleted,
    })))
}

/// Upsert every record in `{photos: [...]}`, reporting failures per item
async fn sync_photos(
    State(ctx): State<AppContext>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> CatalogResult<Json<SyncResult>> {
    let body = parse_body(body)?;
    let Some(photos) = body.get("photos").and_then(|p| p.as_array()) else {
        return Err(CatalogError::Validation(
            "Invalid data format: photos should be an array".to_string(),
        ));
    };

    let mut result = SyncResult::default();

    for item in photos {
        let outcome = match serde_json::from_value::<PhotoRecord>(item.clone()) {
            Ok(record) if record.id.is_empty() => Err(("".to_string(), "missing id".to_string())),
            Ok(record) => ctx
                .catalog
                .upsert(&record)
                .await
                .map_err(|e| (record.id.clone(), e.to_string())),
            Err(e) => {
                let id = item
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                Err((id, e.to_string()))
            }
        };

        match outcome {
            Ok(()) => result.success += 1,
            Err((id, error)) => {
                tracing::warn!(id = %id, error = %error, "Failed to sync photo");
                result.failed += 1;
                result.errors.push(SyncError { id, error });
            }
        }
    }

    tracing::info!(success = result.success, failed = result.failed, "Photo sync finished");

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_fields() {
        let record = PhotoRecord {
            id: "a".to_string(),
            ..Default::default()
        };

        let err = require_fields(&record).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Missing required fields: title, path");

        let record = PhotoRecord {
            id: "a".to_string(),
            title: "t".to_string(),
            path: "photos/a.jpg".to_string(),
            ..Default::default()
        };
        assert!(require_fields(&record).is_ok());
    }
}
