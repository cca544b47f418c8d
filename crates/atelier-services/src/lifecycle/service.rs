//! Asset lifecycle: Active -> Trashed -> Active, and the terminal purge.
//!
//! The catalog row is the authoritative record. Purge removes rows first
//! and releases blobs and cached thumbnails afterwards, best-effort: a
//! storage hiccup may leave an orphaned blob but never a dangling row.

use atelier_core::error::AppError;
use atelier_core::gate::AccessGate;
use atelier_db::Catalog;
use std::sync::Arc;

use crate::thumbs::ThumbnailCache;
use atelier_storage::Storage;

/// Blob deletes are issued in bounded chunks so one huge purge cannot
/// build an unbounded request.
const PURGE_CHUNK_SIZE: usize = 1000;

/// Result of a purge: rows removed from the catalog and blobs actually
/// released from storage. The two can differ when storage misbehaves.
#[derive(Debug, Clone, Default)]
pub struct PurgeOutcome {
    pub purged_rows: u64,
    pub blobs_deleted: usize,
}

pub struct LifecycleService {
    catalog: Arc<dyn Catalog>,
    storage: Arc<dyn Storage>,
    thumbnails: Arc<ThumbnailCache>,
    gate: Arc<dyn AccessGate>,
}

impl LifecycleService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        storage: Arc<dyn Storage>,
        thumbnails: Arc<ThumbnailCache>,
        gate: Arc<dyn AccessGate>,
    ) -> Self {
        Self {
            catalog,
            storage,
            thumbnails,
            gate,
        }
    }

    fn check_gate(&self) -> Result<(), AppError> {
        if !self.gate.is_privileged() {
            return Err(AppError::Unauthorized(
                "Write privilege required".to_string(),
            ));
        }
        Ok(())
    }

    /// Move one active asset to the trash. Trashed assets must not be
    /// served from the thumbnail cache, so their entries go too.
    #[tracing::instrument(skip(self))]
    pub async fn soft_delete(&self, id: i64) -> Result<(), AppError> {
        self.check_gate()?;
        let affected = self.catalog.soft_delete_many(&[id]).await?;
        if affected == 0 {
            return Err(AppError::NotFound(format!(
                "Active asset {} not found",
                id
            )));
        }
        self.invalidate_trashed(&[id]).await;
        Ok(())
    }

    /// Move a batch of active assets to the trash. Missing or
    /// already-trashed ids are skipped; returns the number that
    /// transitioned.
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn soft_delete_batch(&self, ids: &[i64]) -> Result<u64, AppError> {
        self.check_gate()?;
        let affected = self.catalog.soft_delete_many(ids).await?;
        self.invalidate_trashed(ids).await;
        Ok(affected)
    }

    /// Drop thumbnail entries for every id that now sits in the trash.
    /// Disk reclamation is best-effort; failures are logged, not returned.
    async fn invalidate_trashed(&self, ids: &[i64]) {
        for id in ids {
            let asset = match self.catalog.get(*id).await {
                Ok(Some(asset)) if asset.is_trashed() => asset,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(asset_id = id, error = %e, "Lookup failed during invalidation");
                    continue;
                }
            };
            if let Err(e) = self.thumbnails.invalidate(&asset.storage_key).await {
                tracing::warn!(
                    storage_key = %asset.storage_key,
                    error = %e,
                    "Thumbnail invalidation failed"
                );
            }
        }
    }

    /// Bring one trashed asset back to the active view.
    #[tracing::instrument(skip(self))]
    pub async fn restore(&self, id: i64) -> Result<(), AppError> {
        self.check_gate()?;
        let affected = self.catalog.restore_many(&[id]).await?;
        if affected == 0 {
            return Err(AppError::NotFound(format!(
                "Trashed asset {} not found",
                id
            )));
        }
        Ok(())
    }

    /// Restore a batch of trashed assets. Missing or already-active ids
    /// are skipped; returns the number that transitioned.
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn restore_batch(&self, ids: &[i64]) -> Result<u64, AppError> {
        self.check_gate()?;
        self.catalog.restore_many(ids).await
    }

    /// Permanently delete one asset, trashed or not.
    #[tracing::instrument(skip(self))]
    pub async fn purge(&self, id: i64) -> Result<(), AppError> {
        let outcome = self.purge_batch(&[id]).await?;
        if outcome.purged_rows == 0 {
            return Err(AppError::NotFound(format!("Asset {} not found", id)));
        }
        Ok(())
    }

    /// Permanently delete a batch of assets.
    ///
    /// Rows go first; blob and thumbnail cleanup follow best-effort and
    /// never roll the catalog back. Ids with no row are skipped.
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn purge_batch(&self, ids: &[i64]) -> Result<PurgeOutcome, AppError> {
        self.check_gate()?;

        let purged = self.catalog.purge_rows(ids).await?;
        let keys: Vec<String> = purged.into_iter().map(|(_, key)| key).collect();

        let mut outcome = PurgeOutcome {
            purged_rows: keys.len() as u64,
            blobs_deleted: 0,
        };

        for chunk in keys.chunks(PURGE_CHUNK_SIZE) {
            match self.storage.delete_many(chunk).await {
                Ok(deleted) => outcome.blobs_deleted += deleted,
                Err(e) => {
                    tracing::error!(
                        chunk_size = chunk.len(),
                        error = %e,
                        "Blob deletion failed during purge, orphaned objects remain"
                    );
                }
            }
        }

        for key in &keys {
            if let Err(e) = self.thumbnails.invalidate(key).await {
                tracing::warn!(storage_key = %key, error = %e, "Thumbnail invalidation failed");
            }
        }

        tracing::info!(
            purged_rows = outcome.purged_rows,
            blobs_deleted = outcome.blobs_deleted,
            "Purge finished"
        );

        Ok(outcome)
    }
}
