/// Application context and dependency injection
use crate::{
    blob_store::BlobStore,
    catalog::{MetadataStore, SqliteCatalog},
    config::{BlobstoreConfig, ServerConfig},
    db,
    error::{CatalogError, CatalogResult},
    verification::{Deadline, VerificationService},
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub catalog: Arc<SqliteCatalog>,
    pub blob_store: BlobStore,
    verification: VerificationService,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> CatalogResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let pool = db::create_pool(&config.storage.catalog_db, db::DatabaseOptions::default()).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        tracing::info!(path = %config.storage.catalog_db.display(), "Catalog database ready");

        let catalog = Arc::new(SqliteCatalog::new(pool));
        let blob_store = BlobStore::from_config(&config.storage.blobstore, config.service.upload_limit);

        Ok(Self::from_parts(config, catalog, blob_store))
    }

    /// Context over an in-memory catalog and blob store
    pub async fn ephemeral(config: ServerConfig) -> CatalogResult<Self> {
        config.validate()?;

        let catalog = Arc::new(SqliteCatalog::in_memory().await?);
        let blob_store = BlobStore::from_config(&BlobstoreConfig::Memory, config.service.upload_limit);

        Ok(Self::from_parts(config, catalog, blob_store))
    }

    pub fn from_parts(config: ServerConfig, catalog: Arc<SqliteCatalog>, blob_store: BlobStore) -> Self {
        let metadata: Arc<dyn MetadataStore> = catalog.clone();
        let verification =
            VerificationService::new(metadata, blob_store.backend(), config.verification.clone());

        Self {
            config: Arc::new(config),
            catalog,
            blob_store,
            verification,
        }
    }

    /// Verification service bounded by the configured request timeout
    pub fn verifier(&self) -> VerificationService {
        self.verification
            .with_deadline(Deadline::after(self.config.request_timeout()))
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> CatalogResult<()> {
        let data_dir = &config.storage.data_directory;
        if !data_dir.exists() {
            tokio::fs::create_dir_all(data_dir).await.map_err(|e| {
                CatalogError::Internal(format!("Failed to create directory {:?}: {}", data_dir, e))
            })?;
        }

        if let Some(parent) = config.storage.catalog_db.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if let BlobstoreConfig::Disk { location } = &config.storage.blobstore {
            tokio::fs::create_dir_all(location).await?;
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
