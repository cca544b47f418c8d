use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Catalog record for one ingested image asset.
///
/// `width`/`height` of 0 mean the dimensions could not be determined.
/// `deleted_at` set means the asset is trashed: excluded from normal
/// listings, recoverable until purged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Asset {
    pub id: i64,
    pub storage_key: String,
    pub original_filename: String,
    pub width: i32,
    pub height: i32,
    pub file_size: i64,
    pub perceptual_hash: Option<String>,
    pub dominant_color: Option<String>,
    pub prompt: Option<String>,
    pub source: Option<String>,
    pub style: Option<String>,
    pub style_ref: Option<String>,
    pub like_count: i32,
    pub random_order: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub imported_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Asset {
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_liked(&self) -> bool {
        self.like_count > 0
    }

    /// Total pixel count, the quantity resolution buckets are computed over.
    pub fn pixels(&self) -> i64 {
        self.width as i64 * self.height as i64
    }
}

/// Insert payload for a new catalog row. Produced by the ingestion pipeline
/// once the canonical bytes have reached durable storage.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub storage_key: String,
    pub original_filename: String,
    pub width: i32,
    pub height: i32,
    pub file_size: i64,
    pub perceptual_hash: Option<String>,
    pub dominant_color: Option<String>,
    pub prompt: Option<String>,
    pub source: Option<String>,
    pub style: Option<String>,
    pub style_ref: Option<String>,
    pub imported_at: DateTime<Utc>,
}

/// A tagged field update: `Keep` leaves the column untouched, `Set` writes
/// the given value (including `Set(None)` to clear a nullable column).
///
/// This removes the ambiguity between "clear this field" and "don't touch
/// this field" that a plain `Option<Option<T>>` invites.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldUpdate<T> {
    #[default]
    Keep,
    Set(T),
}

impl<T> FieldUpdate<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, FieldUpdate::Set(_))
    }
}

/// Typed patch for descriptive-field edits. Each field is explicitly
/// present-or-absent so the update layer can build a parameterized
/// statement without string concatenation.
#[derive(Debug, Clone, Default)]
pub struct AssetPatch {
    pub prompt: FieldUpdate<Option<String>>,
    pub source: FieldUpdate<Option<String>>,
    pub style: FieldUpdate<Option<String>>,
    pub style_ref: FieldUpdate<Option<String>>,
}

impl AssetPatch {
    pub fn is_empty(&self) -> bool {
        !self.prompt.is_set()
            && !self.source.is_set()
            && !self.style.is_set()
            && !self.style_ref.is_set()
    }
}
