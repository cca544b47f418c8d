//! Gated catalog access.
//!
//! The repository itself is policy-free; this service is the surface the
//! rest of the system reads and edits the catalog through. Trash-view
//! reads and all descriptive edits consult the access gate, the same as
//! the mutating lifecycle operations.

use atelier_core::error::AppError;
use atelier_core::gate::AccessGate;
use atelier_core::models::{Asset, AssetPatch, AssetQuery, AssetView};
use atelier_db::Catalog;
use std::sync::Arc;

pub struct CatalogService {
    catalog: Arc<dyn Catalog>,
    gate: Arc<dyn AccessGate>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn Catalog>, gate: Arc<dyn AccessGate>) -> Self {
        Self { catalog, gate }
    }

    fn check_gate(&self) -> Result<(), AppError> {
        if !self.gate.is_privileged() {
            return Err(AppError::Unauthorized(
                "Write privilege required".to_string(),
            ));
        }
        Ok(())
    }

    /// Filtered, sorted, paginated listing. The trash view is a privileged
    /// read; the active view is open.
    #[tracing::instrument(skip(self, query))]
    pub async fn list(&self, query: &AssetQuery) -> Result<(Vec<Asset>, i64), AppError> {
        if query.view == AssetView::Trash {
            self.check_gate()?;
        }
        self.catalog.list(query).await
    }

    /// Fetch one asset. Trashed assets are only visible to privileged
    /// callers; to everyone else they read as absent.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Asset, AppError> {
        let asset = self
            .catalog
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Asset {} not found", id)))?;

        if asset.is_trashed() && !self.gate.is_privileged() {
            return Err(AppError::NotFound(format!("Asset {} not found", id)));
        }

        Ok(asset)
    }

    /// Apply a descriptive-field patch. An empty patch is a no-op.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, id: i64, patch: AssetPatch) -> Result<(), AppError> {
        self.check_gate()?;

        if patch.is_empty() {
            return Ok(());
        }

        let affected = self.catalog.update(id, patch).await?;
        if affected == 0 {
            return Err(AppError::NotFound(format!("Asset {} not found", id)));
        }
        Ok(())
    }

    /// Set or clear the liked flag.
    #[tracing::instrument(skip(self))]
    pub async fn set_liked(&self, id: i64, liked: bool) -> Result<(), AppError> {
        self.check_gate()?;

        let affected = self.catalog.set_liked(id, liked).await?;
        if affected == 0 {
            return Err(AppError::NotFound(format!("Asset {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockCatalog;
    use atelier_core::gate::{AllowAll, DenyAll};
    use atelier_core::models::{FieldUpdate, NewAsset};
    use chrono::Utc;

    async fn seed(catalog: &MockCatalog, name: &str) -> i64 {
        let asset = catalog
            .insert(NewAsset {
                storage_key: format!("images/2026/08/{}_1_abc123.png", name),
                original_filename: format!("{}.png", name),
                width: 64,
                height: 64,
                file_size: 1024,
                perceptual_hash: None,
                dominant_color: None,
                prompt: None,
                source: None,
                style: None,
                style_ref: None,
                imported_at: Utc::now(),
            })
            .await
            .unwrap();
        asset.id
    }

    #[tokio::test]
    async fn test_trash_view_is_a_privileged_read() {
        let catalog = Arc::new(MockCatalog::new());
        let service = CatalogService::new(catalog.clone(), Arc::new(DenyAll));

        let mut query = AssetQuery::new();
        query.view = AssetView::Trash;
        assert!(matches!(
            service.list(&query).await.unwrap_err(),
            AppError::Unauthorized(_)
        ));

        // The active view stays open
        query.view = AssetView::Active;
        assert!(service.list(&query).await.is_ok());
    }

    #[tokio::test]
    async fn test_trash_view_lists_with_privilege() {
        let catalog = Arc::new(MockCatalog::new());
        let service = CatalogService::new(catalog.clone(), Arc::new(AllowAll));

        let id = seed(&catalog, "a").await;
        catalog.soft_delete_many(&[id]).await.unwrap();

        let mut query = AssetQuery::new();
        query.view = AssetView::Trash;
        let (items, total) = service.list(&query).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].id, id);
    }

    #[tokio::test]
    async fn test_get_hides_trashed_from_unprivileged() {
        let catalog = Arc::new(MockCatalog::new());
        let id = seed(&catalog, "a").await;
        catalog.soft_delete_many(&[id]).await.unwrap();

        let open = CatalogService::new(catalog.clone(), Arc::new(DenyAll));
        assert!(matches!(
            open.get(id).await.unwrap_err(),
            AppError::NotFound(_)
        ));

        let privileged = CatalogService::new(catalog.clone(), Arc::new(AllowAll));
        assert!(privileged.get(id).await.unwrap().is_trashed());
    }

    #[tokio::test]
    async fn test_update_applies_patch_and_distinguishes_clear() {
        let catalog = Arc::new(MockCatalog::new());
        let service = CatalogService::new(catalog.clone(), Arc::new(AllowAll));
        let id = seed(&catalog, "a").await;

        service
            .update(
                id,
                AssetPatch {
                    prompt: FieldUpdate::Set(Some("sunset".to_string())),
                    source: FieldUpdate::Set(Some("camera".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Clearing prompt leaves source untouched
        service
            .update(
                id,
                AssetPatch {
                    prompt: FieldUpdate::Set(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let asset = catalog.get(id).await.unwrap().unwrap();
        assert_eq!(asset.prompt, None);
        assert_eq!(asset.source.as_deref(), Some("camera"));
    }

    #[tokio::test]
    async fn test_update_empty_patch_is_noop() {
        let catalog = Arc::new(MockCatalog::new());
        let service = CatalogService::new(catalog.clone(), Arc::new(AllowAll));

        // Even against a missing id, nothing to do means no error
        assert!(service.update(4242, AssetPatch::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let catalog = Arc::new(MockCatalog::new());
        let service = CatalogService::new(catalog.clone(), Arc::new(AllowAll));

        let patch = AssetPatch {
            prompt: FieldUpdate::Set(Some("x".to_string())),
            ..Default::default()
        };
        assert!(matches!(
            service.update(4242, patch).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_edits_require_privilege() {
        let catalog = Arc::new(MockCatalog::new());
        let id = seed(&catalog, "a").await;
        let service = CatalogService::new(catalog.clone(), Arc::new(DenyAll));

        let patch = AssetPatch {
            prompt: FieldUpdate::Set(Some("x".to_string())),
            ..Default::default()
        };
        assert!(matches!(
            service.update(id, patch).await.unwrap_err(),
            AppError::Unauthorized(_)
        ));
        assert!(matches!(
            service.set_liked(id, true).await.unwrap_err(),
            AppError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn test_set_liked_round_trip() {
        let catalog = Arc::new(MockCatalog::new());
        let service = CatalogService::new(catalog.clone(), Arc::new(AllowAll));
        let id = seed(&catalog, "a").await;

        service.set_liked(id, true).await.unwrap();
        assert!(catalog.get(id).await.unwrap().unwrap().is_liked());

        service.set_liked(id, false).await.unwrap();
        assert!(!catalog.get(id).await.unwrap().unwrap().is_liked());

        assert!(matches!(
            service.set_liked(4242, true).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
