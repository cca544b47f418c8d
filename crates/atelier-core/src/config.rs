//! Configuration module
//!
//! Environment-driven configuration for the asset pipeline: database,
//! storage backend selection, upload limits, thumbnail cache settings and
//! resolution bucket thresholds.

use std::env;

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 30 * 1024 * 1024;
const DEFAULT_THUMBNAIL_QUALITY: u8 = 80;
// width*height boundaries between the medium/high and high/ultra buckets
const DEFAULT_RESOLUTION_MEDIUM_THRESHOLD: i64 = 1_000_000;
const DEFAULT_RESOLUTION_HIGH_THRESHOLD: i64 = 4_000_000;

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Local,
}

impl StorageBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "s3" => Some(StorageBackend::S3),
            "local" => Some(StorageBackend::Local),
            _ => None,
        }
    }
}

/// Application configuration, loaded once at process start and passed by
/// reference to every component.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers
    pub local_storage_path: Option<String>,
    // Ingestion configuration
    pub max_upload_bytes: usize,
    pub allowed_content_types: Vec<String>,
    // Thumbnail cache configuration
    pub thumbnail_cache_dir: String,
    pub thumbnail_quality: u8,
    // Resolution bucketing thresholds (width * height, pixels)
    pub resolution_medium_threshold: i64,
    pub resolution_high_threshold: i64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .map(|v| {
                StorageBackend::parse(&v)
                    .ok_or_else(|| anyhow::anyhow!("Invalid STORAGE_BACKEND: {}", v))
            })
            .transpose()?
            .unwrap_or(StorageBackend::S3);

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .map(|v| v.split(',').map(|s| s.trim().to_lowercase()).collect())
            .unwrap_or_else(|_| {
                vec![
                    "image/jpeg".to_string(),
                    "image/png".to_string(),
                    "image/webp".to_string(),
                    "image/gif".to_string(),
                ]
            });

        let config = Config {
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok().or_else(|| env::var("AWS_REGION").ok()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            allowed_content_types,
            thumbnail_cache_dir: env::var("THUMBNAIL_CACHE_DIR")
                .unwrap_or_else(|_| "/var/cache/atelier/thumbnails".to_string()),
            thumbnail_quality: env_parse("THUMBNAIL_QUALITY", DEFAULT_THUMBNAIL_QUALITY),
            resolution_medium_threshold: env_parse(
                "RESOLUTION_MEDIUM_THRESHOLD",
                DEFAULT_RESOLUTION_MEDIUM_THRESHOLD,
            ),
            resolution_high_threshold: env_parse(
                "RESOLUTION_HIGH_THRESHOLD",
                DEFAULT_RESOLUTION_HIGH_THRESHOLD,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    anyhow::bail!("S3_BUCKET must be set when STORAGE_BACKEND=s3");
                }
                if self.s3_region.is_none() {
                    anyhow::bail!("S3_REGION or AWS_REGION must be set when STORAGE_BACKEND=s3");
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    anyhow::bail!("LOCAL_STORAGE_PATH must be set when STORAGE_BACKEND=local");
                }
            }
        }

        if self.max_upload_bytes == 0 {
            anyhow::bail!("MAX_UPLOAD_BYTES must be greater than 0");
        }
        if !(1..=100).contains(&self.thumbnail_quality) {
            anyhow::bail!("THUMBNAIL_QUALITY must be between 1 and 100");
        }
        if self.resolution_medium_threshold >= self.resolution_high_threshold {
            anyhow::bail!(
                "RESOLUTION_MEDIUM_THRESHOLD must be below RESOLUTION_HIGH_THRESHOLD"
            );
        }

        Ok(())
    }
}
