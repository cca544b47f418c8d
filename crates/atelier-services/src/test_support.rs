//! In-memory test doubles so services can be exercised without Postgres.

use async_trait::async_trait;
use atelier_core::error::AppError;
use atelier_core::models::{
    Asset, AssetPatch, AssetQuery, AssetView, FieldUpdate, NewAsset,
};
use atelier_db::Catalog;
use chrono::Utc;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

const MEDIUM_THRESHOLD: i64 = 1_000_000;
const HIGH_THRESHOLD: i64 = 4_000_000;

/// Encode a solid-color PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([90, 120, 180, 255]));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    buffer
}

/// In-memory catalog double. Mirrors the guarded-update semantics of the
/// Postgres repository closely enough for service-level tests.
pub struct MockCatalog {
    assets: Arc<Mutex<BTreeMap<i64, Asset>>>,
    next_id: AtomicI64,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            assets: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: AtomicI64::new(1),
        }
    }

    /// Seed an asset directly, bypassing the ingestion pipeline.
    pub fn add(&self, asset: Asset) {
        self.assets.lock().unwrap().insert(asset.id, asset);
    }

    pub fn contains(&self, id: i64) -> bool {
        self.assets.lock().unwrap().contains_key(&id)
    }

    fn matches(&self, asset: &Asset, query: &AssetQuery) -> bool {
        match query.view {
            AssetView::Active => {
                if asset.is_trashed() {
                    return false;
                }
            }
            AssetView::Trash => {
                if !asset.is_trashed() {
                    return false;
                }
            }
        }

        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = asset
                .prompt
                .as_deref()
                .is_some_and(|p| p.to_lowercase().contains(&needle))
                || asset.original_filename.to_lowercase().contains(&needle)
                || asset.storage_key.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        if let Some(bucket) = query.resolution {
            let (lo, hi) = bucket.pixel_range(MEDIUM_THRESHOLD, HIGH_THRESHOLD);
            let pixels = asset.pixels();
            if pixels < lo || hi.is_some_and(|hi| pixels >= hi) {
                return false;
            }
        }

        if query.liked_only && !asset.is_liked() {
            return false;
        }

        true
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    async fn insert(&self, new: NewAsset) -> Result<Asset, AppError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let asset = Asset {
            id,
            storage_key: new.storage_key,
            original_filename: new.original_filename,
            width: new.width,
            height: new.height,
            file_size: new.file_size,
            perceptual_hash: new.perceptual_hash,
            dominant_color: new.dominant_color,
            prompt: new.prompt,
            source: new.source,
            style: new.style,
            style_ref: new.style_ref,
            like_count: 0,
            random_order: None,
            created_at: now,
            imported_at: new.imported_at,
            updated_at: now,
            deleted_at: None,
        };
        self.assets.lock().unwrap().insert(id, asset.clone());
        Ok(asset)
    }

    async fn get(&self, id: i64) -> Result<Option<Asset>, AppError> {
        Ok(self.assets.lock().unwrap().get(&id).cloned())
    }

    async fn update(&self, id: i64, patch: AssetPatch) -> Result<u64, AppError> {
        if patch.is_empty() {
            return Ok(0);
        }
        let mut assets = self.assets.lock().unwrap();
        let Some(asset) = assets.get_mut(&id) else {
            return Ok(0);
        };
        if let FieldUpdate::Set(prompt) = patch.prompt {
            asset.prompt = prompt;
        }
        if let FieldUpdate::Set(source) = patch.source {
            asset.source = source;
        }
        if let FieldUpdate::Set(style) = patch.style {
            asset.style = style;
        }
        if let FieldUpdate::Set(style_ref) = patch.style_ref {
            asset.style_ref = style_ref;
        }
        asset.updated_at = Utc::now();
        Ok(1)
    }

    async fn set_liked(&self, id: i64, liked: bool) -> Result<u64, AppError> {
        let mut assets = self.assets.lock().unwrap();
        let Some(asset) = assets.get_mut(&id) else {
            return Ok(0);
        };
        asset.like_count = if liked { asset.like_count.max(1) } else { 0 };
        asset.updated_at = Utc::now();
        Ok(1)
    }

    async fn list(&self, query: &AssetQuery) -> Result<(Vec<Asset>, i64), AppError> {
        let assets = self.assets.lock().unwrap();
        let mut matching: Vec<Asset> = assets
            .values()
            .filter(|a| self.matches(a, query))
            .cloned()
            .collect();
        let total = matching.len() as i64;

        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let (_, page_size) = query.normalized();
        let page: Vec<Asset> = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(page_size as usize)
            .collect();

        Ok((page, total))
    }

    async fn soft_delete_many(&self, ids: &[i64]) -> Result<u64, AppError> {
        let mut assets = self.assets.lock().unwrap();
        let mut affected = 0;
        for id in ids {
            if let Some(asset) = assets.get_mut(id) {
                if asset.deleted_at.is_none() {
                    asset.deleted_at = Some(Utc::now());
                    asset.updated_at = Utc::now();
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    async fn restore_many(&self, ids: &[i64]) -> Result<u64, AppError> {
        let mut assets = self.assets.lock().unwrap();
        let mut affected = 0;
        for id in ids {
            if let Some(asset) = assets.get_mut(id) {
                if asset.deleted_at.is_some() {
                    asset.deleted_at = None;
                    asset.updated_at = Utc::now();
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    async fn purge_rows(&self, ids: &[i64]) -> Result<Vec<(i64, String)>, AppError> {
        let mut assets = self.assets.lock().unwrap();
        let mut purged = Vec::new();
        for id in ids {
            if let Some(asset) = assets.remove(id) {
                purged.push((asset.id, asset.storage_key));
            }
        }
        Ok(purged)
    }
}
