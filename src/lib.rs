/// Photo catalog service
///
/// Stores photo records in SQLite and their originals and thumbnails in a
/// blob store, and verifies that the two stay consistent.

pub mod api;
pub mod blob_store;
pub mod catalog;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod server;
pub mod verification;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{CatalogError, CatalogResult};
