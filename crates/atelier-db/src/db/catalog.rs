use async_trait::async_trait;
use atelier_core::error::AppError;
use atelier_core::models::{Asset, AssetPatch, AssetQuery, NewAsset};

/// Catalog access seam consumed by the service layer.
///
/// The production implementation is [`super::repository::AssetRepository`]
/// over Postgres; tests substitute an in-memory double so the services can
/// be exercised without a database.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Insert a new catalog row and return the stored asset.
    async fn insert(&self, asset: NewAsset) -> Result<Asset, AppError>;

    /// Fetch a single asset by id, trashed or not.
    async fn get(&self, id: i64) -> Result<Option<Asset>, AppError>;

    /// Apply a descriptive-field patch. Returns the number of rows touched
    /// (0 when the asset does not exist or the patch is empty).
    async fn update(&self, id: i64, patch: AssetPatch) -> Result<u64, AppError>;

    /// Set or clear the liked flag. Returns the number of rows touched.
    async fn set_liked(&self, id: i64, liked: bool) -> Result<u64, AppError>;

    /// Filtered, sorted, paginated listing plus the total row count for the
    /// same predicate.
    async fn list(&self, query: &AssetQuery) -> Result<(Vec<Asset>, i64), AppError>;

    /// Move active assets to the trash. Already-trashed ids are left
    /// untouched. Returns the number of rows that transitioned.
    async fn soft_delete_many(&self, ids: &[i64]) -> Result<u64, AppError>;

    /// Bring trashed assets back to the active view. Active ids are left
    /// untouched. Returns the number of rows that transitioned.
    async fn restore_many(&self, ids: &[i64]) -> Result<u64, AppError>;

    /// Permanently delete catalog rows, returning `(id, storage_key)` for
    /// each row actually removed. The caller releases the backing blobs
    /// afterwards; the catalog row is the authoritative record, so it goes
    /// first.
    async fn purge_rows(&self, ids: &[i64]) -> Result<Vec<(i64, String)>, AppError>;
}
