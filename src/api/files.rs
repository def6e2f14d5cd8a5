/// File upload, serving and collection-level verification endpoints
use crate::{
    blob_store::UploadedBlob,
    context::AppContext,
    error::{CatalogError, CatalogResult},
};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

/// Build file routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/upload", post(upload_file))
        .route("/api/files/*path", get(files))
}

/// Accepts multipart form data with a `file` part and a `path` part
async fn upload_file(
    State(ctx): State<AppContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> CatalogResult<Json<UploadedBlob>> {
    let mut multipart = multipart.map_err(|e| {
        CatalogError::Validation(format!(
            "Content-Type must be multipart/form-data: {}",
            e.body_text()
        ))
    })?;

    let mut file: Option<(Vec<u8>, Option<String>)> = None;
    let mut path: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CatalogError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().map(String::from);

        match name.as_deref() {
            Some("file") => {
                let content_type = field.content_type().map(String::from);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| CatalogError::Validation(format!("Failed to read file: {}", e)))?;
                file = Some((data.to_vec(), content_type));
            }
            Some("path") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| CatalogError::Validation(format!("Failed to read path: {}", e)))?;
                path = Some(value.trim().to_string());
            }
            _ => {}
        }
    }

    let (Some((data, content_type)), Some(path)) = (file, path.filter(|p| !p.is_empty())) else {
        return Err(CatalogError::Validation("Missing file or path".to_string()));
    };

    let uploaded = ctx
        .blob_store
        .upload(&path, data, content_type.as_deref())
        .await?;

    Ok(Json(uploaded))
}

/// `/api/files/count` and `/api/files/integrity/{id}` share the wildcard
/// with raw file serving, so dispatch happens here.
async fn files(
    State(ctx): State<AppContext>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> CatalogResult<Response> {
    if path == "count" {
        let count = ctx.verifier().reconcile_count().await?;
        return Ok(Json(count).into_response());
    }

    if let Some(id) = path.strip_prefix("integrity/") {
        if !id.is_empty() && !id.contains('/') {
            return check_integrity(&ctx, id).await;
        }
    }

    serve_file(&ctx, &path, &headers).await
}

async fn check_integrity(ctx: &AppContext, id: &str) -> CatalogResult<Response> {
    let verdict = ctx
        .verifier()
        .check_integrity(id)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("Photo not found: {}", id)))?;

    Ok(Json(json!({ "integrity": verdict })).into_response())
}

/// Serve blob content with its content type and a content-derived ETag
async fn serve_file(ctx: &AppContext, path: &str, headers: &HeaderMap) -> CatalogResult<Response> {
    let file = ctx
        .blob_store
        .fetch(path)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("File not found: {}", path)))?;

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .map_or(false, |value| value == file.etag);

    if not_modified {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, file.etag)]).into_response());
    }

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.content_type),
            (header::ETAG, file.etag),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        file.data,
    )
        .into_response())
}
