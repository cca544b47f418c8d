//! Disk thumbnail cache keyed by source content identity.
//!
//! Storage keys are never recycled, so a cached thumbnail never goes stale;
//! entries are immutable until the source is trashed or purged and the
//! key's entries invalidated (a restored asset simply regenerates on the
//! next miss). Concurrent misses for the same entry race harmlessly: both
//! render the same deterministic bytes and the last rename wins.

use atelier_core::error::AppError;
use atelier_processing::render_thumbnail;
use atelier_storage::{Storage, StorageError};
use bytes::Bytes;
use rand::{distr::Alphanumeric, Rng};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

const MIN_WIDTH: u32 = 16;
const MAX_WIDTH: u32 = 4096;

/// Content-addressed JPEG thumbnail cache over a storage backend.
pub struct ThumbnailCache {
    storage: Arc<dyn Storage>,
    cache_dir: PathBuf,
    quality: u8,
}

impl ThumbnailCache {
    pub fn new(storage: Arc<dyn Storage>, cache_dir: impl Into<PathBuf>, quality: u8) -> Self {
        Self {
            storage,
            cache_dir: cache_dir.into(),
            quality,
        }
    }

    /// Return the thumbnail for `source_key` at the requested width,
    /// rendering and caching it on first access.
    #[tracing::instrument(skip(self))]
    pub async fn get_thumbnail(&self, source_key: &str, width: u32) -> Result<Bytes, AppError> {
        if !(MIN_WIDTH..=MAX_WIDTH).contains(&width) {
            return Err(AppError::InvalidInput(format!(
                "Thumbnail width {} out of range ({}..={})",
                width, MIN_WIDTH, MAX_WIDTH
            )));
        }

        let path = self.cache_dir.join(entry_name(source_key, width));

        // Entries are immutable, a readable file is always a valid hit.
        match tokio::fs::read(&path).await {
            Ok(data) => {
                tracing::debug!(source_key, width, "Thumbnail cache hit");
                return Ok(Bytes::from(data));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let start = Instant::now();

        let source = self.storage.get(source_key).await.map_err(|e| match e {
            StorageError::NotFound(_) => {
                AppError::NotFound(format!("Asset content not found: {}", source_key))
            }
            other => AppError::Storage(other.to_string()),
        })?;

        let quality = self.quality;
        let rendered = tokio::task::spawn_blocking(move || render_thumbnail(&source, width, quality))
            .await
            .map_err(|e| AppError::Internal(format!("Thumbnail task failed: {}", e)))?
            .map_err(|e| AppError::InternalWithSource {
                message: "Thumbnail rendering failed".to_string(),
                source: e,
            })?;

        if let Err(e) = self.write_entry(&path, &rendered).await {
            // The response is still served; only the cache loses out.
            tracing::warn!(source_key, width, error = %e, "Failed to write thumbnail cache entry");
        }

        tracing::debug!(
            source_key,
            width,
            bytes = rendered.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Thumbnail rendered"
        );

        Ok(rendered)
    }

    /// Write-then-rename so a crash mid-write never leaves a truncated
    /// entry behind under the final name.
    async fn write_entry(&self, path: &Path, data: &[u8]) -> Result<(), std::io::Error> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect();
        let tmp = path.with_extension(format!("jpg.tmp.{}", suffix));

        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, path).await
    }

    /// Remove every cached width for a source key. Returns the number of
    /// entries removed; an absent cache directory counts as empty.
    #[tracing::instrument(skip(self))]
    pub async fn invalidate(&self, source_key: &str) -> Result<usize, AppError> {
        let prefix = cache_prefix(source_key);

        let mut entries = match tokio::fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(&prefix) {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                // A concurrent invalidation got there first
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!(source_key, removed, "Invalidated thumbnail cache entries");
        Ok(removed)
    }
}

/// First 16 bytes of `sha256(source_key)` as hex. Long enough that distinct
/// keys never collide in practice, short enough for comfortable filenames.
fn cache_prefix(source_key: &str) -> String {
    let digest = Sha256::digest(source_key.as_bytes());
    hex::encode(&digest[..16])
}

fn entry_name(source_key: &str, width: u32) -> String {
    format!("{}_{}.jpg", cache_prefix(source_key), width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::png_bytes;
    use atelier_storage::LocalStorage;
    use tempfile::TempDir;

    const KEY: &str = "images/2026/08/cat_1755900000000_a1b2c3.png";

    async fn setup() -> (ThumbnailCache, Arc<dyn Storage>, TempDir, TempDir) {
        let storage_dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let storage: Arc<dyn Storage> =
            Arc::new(LocalStorage::new(storage_dir.path()).await.unwrap());
        let cache = ThumbnailCache::new(storage.clone(), cache_dir.path(), 80);
        (cache, storage, storage_dir, cache_dir)
    }

    #[tokio::test]
    async fn test_miss_renders_and_caches() {
        let (cache, storage, _sd, cache_dir) = setup().await;
        storage.put(KEY, png_bytes(800, 600), "image/png").await.unwrap();

        let thumb = cache.get_thumbnail(KEY, 256).await.unwrap();
        let img = image::load_from_memory(&thumb).unwrap();
        assert_eq!((img.width(), img.height()), (256, 192));

        // Entry landed under the hashed name
        let entries: Vec<_> = std::fs::read_dir(cache_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].ends_with("_256.jpg"));
    }

    #[tokio::test]
    async fn test_hit_does_not_touch_storage() {
        let (cache, storage, _sd, _cd) = setup().await;
        storage.put(KEY, png_bytes(400, 400), "image/png").await.unwrap();

        let first = cache.get_thumbnail(KEY, 128).await.unwrap();

        // Once cached, the source can disappear and hits keep serving
        storage.delete(KEY).await.unwrap();
        let second = cache.get_thumbnail(KEY, 128).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_source_is_not_found() {
        let (cache, _storage, _sd, _cd) = setup().await;
        let err = cache.get_thumbnail(KEY, 128).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_width_bounds() {
        let (cache, storage, _sd, _cd) = setup().await;
        storage.put(KEY, png_bytes(64, 64), "image/png").await.unwrap();

        assert!(matches!(
            cache.get_thumbnail(KEY, 0).await.unwrap_err(),
            AppError::InvalidInput(_)
        ));
        assert!(matches!(
            cache.get_thumbnail(KEY, 10_000).await.unwrap_err(),
            AppError::InvalidInput(_)
        ));
        assert!(cache.get_thumbnail(KEY, 16).await.is_ok());
        assert!(cache.get_thumbnail(KEY, 4096).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalidate_removes_all_widths() {
        let (cache, storage, _sd, cache_dir) = setup().await;
        storage.put(KEY, png_bytes(640, 480), "image/png").await.unwrap();

        cache.get_thumbnail(KEY, 128).await.unwrap();
        cache.get_thumbnail(KEY, 256).await.unwrap();

        let other_key = "images/2026/08/dog_1755900000001_x9y8z7.png";
        storage.put(other_key, png_bytes(64, 64), "image/png").await.unwrap();
        cache.get_thumbnail(other_key, 64).await.unwrap();

        let removed = cache.invalidate(KEY).await.unwrap();
        assert_eq!(removed, 2);

        // The other source's entry survives
        let remaining = std::fs::read_dir(cache_dir.path()).unwrap().count();
        assert_eq!(remaining, 1);
    }

    #[tokio::test]
    async fn test_invalidate_missing_dir_is_empty() {
        let storage_dir = TempDir::new().unwrap();
        let storage: Arc<dyn Storage> =
            Arc::new(LocalStorage::new(storage_dir.path()).await.unwrap());
        let cache = ThumbnailCache::new(storage, storage_dir.path().join("never-created"), 80);
        assert_eq!(cache.invalidate(KEY).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_get_distinct_prefixes() {
        assert_ne!(cache_prefix("a"), cache_prefix("b"));
        assert_eq!(cache_prefix("a").len(), 32);
    }
}
