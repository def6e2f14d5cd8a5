/// Record verification endpoints
use crate::{
    context::AppContext,
    error::{CatalogError, CatalogResult},
    verification::{BatchSummary, FileCheck},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

/// Build verification routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/metadata/:id", get(get_metadata))
        .route("/api/verify/:id", get(verify_photo))
        .route("/api/batch-verify", post(batch_verify))
}

#[derive(Debug, Deserialize)]
pub struct BatchVerifyRequest {
    pub ids: Vec<String>,
}

async fn get_metadata(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> CatalogResult<Json<serde_json::Value>> {
    let metadata = ctx
        .catalog
        .get_metadata(&id)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("Photo not found: {}", id)))?;

    Ok(Json(json!({ "metadata": metadata })))
}

async fn verify_photo(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> CatalogResult<Json<FileCheck>> {
    Ok(Json(ctx.verifier().verify_files(&id).await?))
}

async fn batch_verify(
    State(ctx): State<AppContext>,
    body: Result<Json<BatchVerifyRequest>, JsonRejection>,
) -> CatalogResult<Json<BatchSummary>> {
    let Json(request) = body.map_err(|e| {
        CatalogError::Validation(format!(
            "Invalid request: ids should be a non-empty array ({})",
            e.body_text()
        ))
    })?;

    Ok(Json(ctx.verifier().verify_batch(&request.ids).await?))
}
