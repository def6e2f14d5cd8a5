/// API routes and handlers
pub mod admin;
pub mod files;
pub mod photos;
pub mod server;
pub mod verify;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(server::routes())
        .merge(photos::routes())
        .merge(files::routes())
        .merge(verify::routes())
        .merge(admin::routes())
}
