/// Administrative endpoints
use crate::{
    context::AppContext,
    error::{CatalogError, CatalogResult},
    verification::{PurgeReport, StoragePurge},
};
use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Build admin routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/clear", post(clear_all))
}

#[derive(Debug, Deserialize)]
pub struct ClearQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub report: PurgeReport,
}

/// Compares SHA-256 digests of both tokens
fn token_matches(provided: &str, expected: &str) -> bool {
    Sha256::digest(provided.as_bytes()) == Sha256::digest(expected.as_bytes())
}

fn authorize(ctx: &AppContext, token: Option<&str>) -> CatalogResult<()> {
    let Some(expected) = ctx.config.admin.clear_token.as_deref() else {
        return Err(CatalogError::Authorization(
            "Clearing is disabled on this server".to_string(),
        ));
    };

    match token {
        Some(token) if token_matches(token, expected) => Ok(()),
        _ => Err(CatalogError::Authorization("Invalid clear token".to_string())),
    }
}

/// Delete every record and up to the purge cap of stored files
async fn clear_all(
    State(ctx): State<AppContext>,
    Query(query): Query<ClearQuery>,
) -> CatalogResult<Json<ClearResponse>> {
    authorize(&ctx, query.token.as_deref())?;

    tracing::warn!("Clear requested; purging catalog and storage");

    let report = ctx.verifier().purge_all().await;

    let message = match &report.storage {
        _ if !report.is_success() => "Clear finished with errors; storage state must be re-verified",
        StoragePurge::CapReached { .. } => "Purge cap reached; call again to delete remaining files",
        _ => "All data cleared",
    };

    Ok(Json(ClearResponse {
        success: report.is_success(),
        message: message.to_string(),
        report,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches() {
        assert!(token_matches("secret", "secret"));
        assert!(!token_matches("secret", "Secret"));
        assert!(!token_matches("", "secret"));
    }
}
