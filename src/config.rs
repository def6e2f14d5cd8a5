/// Configuration management for the photo catalog
use crate::{
    error::{CatalogError, CatalogResult},
    verification::VerificationPolicy,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "photo_catalog=debug,tower_http=debug";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub verification: VerificationPolicy,
    pub admin: AdminConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
    pub upload_limit: usize,
    /// Per-request deadline applied to verification calls
    pub request_timeout_secs: u64,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub catalog_db: PathBuf,
    pub blobstore: BlobstoreConfig,
}

/// Blob storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlobstoreConfig {
    Disk { location: PathBuf },
    Memory,
}

/// Administrative configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Token required by the clear endpoint; unset disables it
    #[serde(skip_serializing)]
    pub clear_token: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Parse an optional environment variable, keeping `default` when unset
fn parse_var<T: FromStr>(name: &str, default: T) -> CatalogResult<T> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| CatalogError::Validation(format!("Invalid value for {}: {}", name, value))),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> CatalogResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("CATALOG_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("CATALOG_PORT")
            .unwrap_or_else(|_| "8787".to_string())
            .parse()
            .map_err(|_| CatalogError::Validation("Invalid port number".to_string()))?;
        let version = env::var("CATALOG_VERSION")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());
        let upload_limit = parse_var("CATALOG_UPLOAD_LIMIT", 50 * 1024 * 1024)?;
        let request_timeout_secs = parse_var("CATALOG_REQUEST_TIMEOUT_SECS", 30)?;

        let data_directory: PathBuf = env::var("CATALOG_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let catalog_db = env::var("CATALOG_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("catalog.sqlite"));

        let blobstore = match env::var("CATALOG_BLOBSTORE")
            .unwrap_or_else(|_| "disk".to_string())
            .to_lowercase()
            .as_str()
        {
            "disk" => BlobstoreConfig::Disk {
                location: env::var("CATALOG_BLOBSTORE_DISK_LOCATION")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| data_directory.join("blobs")),
            },
            "memory" => BlobstoreConfig::Memory,
            other => {
                return Err(CatalogError::Validation(format!(
                    "Unknown blobstore type: {}",
                    other
                )))
            }
        };

        let defaults = VerificationPolicy::default();
        let verification = VerificationPolicy {
            min_original_size: parse_var("CATALOG_MIN_ORIGINAL_SIZE", defaults.min_original_size)?,
            batch_limit: parse_var("CATALOG_BATCH_LIMIT", defaults.batch_limit)?,
            batch_concurrency: parse_var("CATALOG_BATCH_CONCURRENCY", defaults.batch_concurrency)?,
            purge_cap: parse_var("CATALOG_PURGE_CAP", defaults.purge_cap)?,
            purge_page_size: parse_var("CATALOG_PURGE_PAGE_SIZE", defaults.purge_page_size)?,
            count_page_size: parse_var("CATALOG_COUNT_PAGE_SIZE", defaults.count_page_size)?,
            max_list_pages: parse_var("CATALOG_MAX_LIST_PAGES", defaults.max_list_pages)?,
            ..defaults
        };

        let clear_token = env::var("CATALOG_CLEAR_TOKEN")
            .ok()
            .filter(|token| !token.is_empty());

        let level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
        let format = match env::var("CATALOG_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
                upload_limit,
                request_timeout_secs,
            },
            storage: StorageConfig {
                data_directory,
                catalog_db,
                blobstore,
            },
            verification,
            admin: AdminConfig { clear_token },
            logging: LoggingConfig { level, format },
        })
    }

    /// In-memory configuration for tests and ephemeral runs
    pub fn ephemeral() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 0,
                version: env!("CARGO_PKG_VERSION").to_string(),
                upload_limit: 50 * 1024 * 1024,
                request_timeout_secs: 30,
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                catalog_db: PathBuf::from(":memory:"),
                blobstore: BlobstoreConfig::Memory,
            },
            verification: VerificationPolicy::default(),
            admin: AdminConfig { clear_token: None },
            logging: LoggingConfig {
                level: DEFAULT_LOG_FILTER.to_string(),
                format: LogFormat::Text,
            },
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.service.request_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> CatalogResult<()> {
        if self.service.hostname.is_empty() {
            return Err(CatalogError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.service.upload_limit == 0 {
            return Err(CatalogError::Validation(
                "Upload limit must be greater than zero".to_string(),
            ));
        }

        if self.service.request_timeout_secs == 0 {
            return Err(CatalogError::Validation(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        self.verification.validate()
    }
}
