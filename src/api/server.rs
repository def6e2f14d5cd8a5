/// Service description endpoints
use crate::context::AppContext;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

/// Build server routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/hello", get(hello))
}

#[derive(Debug, Serialize)]
pub struct HelloResponse {
    pub message: String,
    pub timestamp: String,
    pub version: String,
}

async fn hello(State(ctx): State<AppContext>) -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from the photo catalog API".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        version: ctx.config.service.version.clone(),
    })
}
