use async_trait::async_trait;
use atelier_core::error::AppError;
use atelier_core::models::{Asset, AssetPatch, AssetQuery, AssetView, FieldUpdate, NewAsset, SortMode};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;

use super::catalog::Catalog;

/// Lifecycle batches are chunked so a large purge never builds an unbounded
/// `ANY($1)` array.
const BATCH_CHUNK_SIZE: usize = 500;

/// Postgres-backed catalog.
///
/// Listing predicates are assembled with `QueryBuilder` so every user value
/// travels as a bind parameter. The resolution thresholds come from
/// configuration and split `width * height` into the three buckets.
pub struct AssetRepository {
    pool: PgPool,
    medium_threshold: i64,
    high_threshold: i64,
}

impl AssetRepository {
    pub fn new(pool: PgPool, medium_threshold: i64, high_threshold: i64) -> Self {
        Self {
            pool,
            medium_threshold,
            high_threshold,
        }
    }

    async fn count_matching(&self, query: &AssetQuery) -> Result<i64, AppError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM assets");
        push_filters(
            &mut builder,
            query,
            self.medium_threshold,
            self.high_threshold,
        );
        let total: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total)
    }

    /// Seeded shuffle over the unfiltered lifecycle view.
    ///
    /// Every matching id gets a rank derived from the seed, the whole set is
    /// ordered by that rank, and the requested page is sliced out. The same
    /// seed therefore yields the same ordering across pages until the match
    /// set itself changes.
    async fn list_shuffled(
        &self,
        query: &AssetQuery,
        seed: u64,
    ) -> Result<(Vec<Asset>, i64), AppError> {
        let mut builder = QueryBuilder::new("SELECT id FROM assets");
        push_filters(
            &mut builder,
            query,
            self.medium_threshold,
            self.high_threshold,
        );
        let ids: Vec<i64> = builder.build_query_scalar().fetch_all(&self.pool).await?;
        let total = ids.len() as i64;

        let (_, page_size) = query.normalized();
        let page_ids = shuffle_page(ids, seed, query.offset() as usize, page_size as usize);

        if page_ids.is_empty() {
            return Ok((Vec::new(), total));
        }

        let rows: Vec<Asset> =
            sqlx::query_as("SELECT * FROM assets WHERE id = ANY($1)")
                .bind(&page_ids)
                .fetch_all(&self.pool)
                .await?;

        // Restore the shuffle order lost by the id-set fetch.
        let mut by_id: HashMap<i64, Asset> = rows.into_iter().map(|a| (a.id, a)).collect();
        let ordered = page_ids.iter().filter_map(|id| by_id.remove(id)).collect();

        Ok((ordered, total))
    }
}

#[async_trait]
impl Catalog for AssetRepository {
    #[tracing::instrument(skip(self, asset), fields(storage_key = %asset.storage_key))]
    async fn insert(&self, asset: NewAsset) -> Result<Asset, AppError> {
        let row = sqlx::query_as::<_, Asset>(
            r#"
            INSERT INTO assets (
                storage_key, original_filename, width, height, file_size,
                perceptual_hash, dominant_color, prompt, source, style,
                style_ref, imported_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(&asset.storage_key)
        .bind(&asset.original_filename)
        .bind(asset.width)
        .bind(asset.height)
        .bind(asset.file_size)
        .bind(&asset.perceptual_hash)
        .bind(&asset.dominant_color)
        .bind(&asset.prompt)
        .bind(&asset.source)
        .bind(&asset.style)
        .bind(&asset.style_ref)
        .bind(asset.imported_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(asset_id = row.id, "Inserted catalog row");
        Ok(row)
    }

    async fn get(&self, id: i64) -> Result<Option<Asset>, AppError> {
        let row = sqlx::query_as::<_, Asset>("SELECT * FROM assets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update(&self, id: i64, patch: AssetPatch) -> Result<u64, AppError> {
        if patch.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::new("UPDATE assets SET updated_at = now()");

        if let FieldUpdate::Set(prompt) = patch.prompt {
            builder.push(", prompt = ").push_bind(prompt);
        }
        if let FieldUpdate::Set(source) = patch.source {
            builder.push(", source = ").push_bind(source);
        }
        if let FieldUpdate::Set(style) = patch.style {
            builder.push(", style = ").push_bind(style);
        }
        if let FieldUpdate::Set(style_ref) = patch.style_ref {
            builder.push(", style_ref = ").push_bind(style_ref);
        }

        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self))]
    async fn set_liked(&self, id: i64, liked: bool) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE assets
            SET like_count = CASE WHEN $2 THEN GREATEST(like_count, 1) ELSE 0 END,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(liked)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self, query))]
    async fn list(&self, query: &AssetQuery) -> Result<(Vec<Asset>, i64), AppError> {
        if let SortMode::Random { seed: Some(seed) } = query.sort {
            if !query.has_filters() {
                return self.list_shuffled(query, seed).await;
            }
        }

        let (_, page_size) = query.normalized();

        let mut builder = QueryBuilder::new("SELECT * FROM assets");
        push_filters(
            &mut builder,
            query,
            self.medium_threshold,
            self.high_threshold,
        );

        match query.sort {
            SortMode::Newest => {
                builder.push(" ORDER BY created_at DESC, id DESC");
            }
            // Filtered or unseeded shuffles are not reproducible across
            // requests; each call draws a fresh ordering.
            SortMode::Random { .. } => {
                builder.push(" ORDER BY random()");
            }
        }

        builder
            .push(" LIMIT ")
            .push_bind(page_size)
            .push(" OFFSET ")
            .push_bind(query.offset());

        let rows: Vec<Asset> = builder.build_query_as().fetch_all(&self.pool).await?;
        let total = self.count_matching(query).await?;

        Ok((rows, total))
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn soft_delete_many(&self, ids: &[i64]) -> Result<u64, AppError> {
        let mut affected = 0u64;
        for chunk in ids.chunks(BATCH_CHUNK_SIZE) {
            let result = sqlx::query(
                r#"
                UPDATE assets
                SET deleted_at = now(), updated_at = now()
                WHERE id = ANY($1) AND deleted_at IS NULL
                "#,
            )
            .bind(chunk)
            .execute(&self.pool)
            .await?;
            affected += result.rows_affected();
        }
        tracing::debug!(affected, "Soft-deleted assets");
        Ok(affected)
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn restore_many(&self, ids: &[i64]) -> Result<u64, AppError> {
        let mut affected = 0u64;
        for chunk in ids.chunks(BATCH_CHUNK_SIZE) {
            let result = sqlx::query(
                r#"
                UPDATE assets
                SET deleted_at = NULL, updated_at = now()
                WHERE id = ANY($1) AND deleted_at IS NOT NULL
                "#,
            )
            .bind(chunk)
            .execute(&self.pool)
            .await?;
            affected += result.rows_affected();
        }
        tracing::debug!(affected, "Restored assets");
        Ok(affected)
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn purge_rows(&self, ids: &[i64]) -> Result<Vec<(i64, String)>, AppError> {
        let mut purged = Vec::new();
        for chunk in ids.chunks(BATCH_CHUNK_SIZE) {
            let rows: Vec<(i64, String)> = sqlx::query_as(
                "DELETE FROM assets WHERE id = ANY($1) RETURNING id, storage_key",
            )
            .bind(chunk)
            .fetch_all(&self.pool)
            .await?;
            purged.extend(rows);
        }
        tracing::debug!(purged = purged.len(), "Purged catalog rows");
        Ok(purged)
    }
}

/// Append the conjunctive WHERE clause for a catalog query. Every user
/// value travels as a bind parameter; only fixed SQL fragments are pushed
/// as text.
fn push_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    query: &AssetQuery,
    medium_threshold: i64,
    high_threshold: i64,
) {
    match query.view {
        AssetView::Active => builder.push(" WHERE deleted_at IS NULL"),
        AssetView::Trash => builder.push(" WHERE deleted_at IS NOT NULL"),
    };

    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        builder
            .push(" AND (prompt ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR original_filename ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR storage_key ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(bucket) = query.resolution {
        let (min_pixels, max_pixels) = bucket.pixel_range(medium_threshold, high_threshold);
        builder
            .push(" AND (width::BIGINT * height::BIGINT) >= ")
            .push_bind(min_pixels);
        if let Some(max_pixels) = max_pixels {
            builder
                .push(" AND (width::BIGINT * height::BIGINT) < ")
                .push_bind(max_pixels);
        }
    }

    if query.liked_only {
        builder.push(" AND like_count > 0");
    }
}

/// Order ids by their seeded rank and slice out one page. The ordering is
/// a pure function of (seed, id set), so consecutive pages under the same
/// seed partition the set without repeats until the set itself changes.
fn shuffle_page(mut ids: Vec<i64>, seed: u64, offset: usize, limit: usize) -> Vec<i64> {
    ids.sort_by_key(|id| (shuffle_rank(seed, *id), *id));
    ids.into_iter().skip(offset).take(limit).collect()
}

/// Rank an id under a shuffle seed: the first 8 bytes of
/// `SHA-256(seed || id)` as a big-endian u64. Stable across processes, so
/// a client can page through a seeded shuffle consistently.
pub fn shuffle_rank(seed: u64, id: i64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_be_bytes());
    hasher.update(id.to_be_bytes());
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Escape LIKE metacharacters so user search terms match literally.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
