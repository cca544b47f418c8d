use atelier_core::error::AppError;
use atelier_core::gate::AccessGate;
use atelier_core::models::{BatchOutcome, IngestedAsset, NewAsset};
use atelier_db::Catalog;
use atelier_processing::{to_canonical, MediaValidator};
use atelier_storage::{generate_key, Storage, CANONICAL_CONTENT_TYPE};
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One incoming upload: raw bytes plus the descriptive fields that land on
/// the catalog row.
#[derive(Debug, Clone)]
pub struct IngestItem {
    pub original_filename: String,
    pub content_type: String,
    pub data: Bytes,
    pub prompt: Option<String>,
    pub source: Option<String>,
    pub style: Option<String>,
    pub style_ref: Option<String>,
}

/// Registration of an object that already sits in storage under a known
/// key. The bytes are fetched back only to measure dimensions and derive
/// metadata; nothing is re-uploaded.
#[derive(Debug, Clone)]
pub struct RegisterItem {
    pub storage_key: String,
    pub original_filename: String,
    pub prompt: Option<String>,
    pub source: Option<String>,
    pub style: Option<String>,
    pub style_ref: Option<String>,
}

/// Batch ingestion pipeline.
///
/// Failures are isolated per item: a bad payload lands in the outcome's
/// `failed` list with a readable reason and the loop moves on. Only
/// batch-level conditions (empty input, missing privilege) abort the whole
/// call.
pub struct IngestService {
    catalog: Arc<dyn Catalog>,
    storage: Arc<dyn Storage>,
    validator: MediaValidator,
    gate: Arc<dyn AccessGate>,
}

impl IngestService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        storage: Arc<dyn Storage>,
        validator: MediaValidator,
        gate: Arc<dyn AccessGate>,
    ) -> Self {
        Self {
            catalog,
            storage,
            validator,
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

    /// Ingest a batch of uploads. Cancellation is honored between items;
    /// an item that has already reached storage is finished, not unwound.
    #[tracing::instrument(skip(self, items, cancel), fields(batch_size = items.len()))]
    pub async fn ingest_batch(
        &self,
        items: Vec<IngestItem>,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, AppError> {
        self.check_gate()?;

        if items.is_empty() {
            return Err(AppError::InvalidInput("Empty batch".to_string()));
        }

        let mut outcome = BatchOutcome::new();

        for item in items {
            if cancel.is_cancelled() {
                outcome.push_failure(&item.original_filename, "Batch cancelled");
                continue;
            }

            match self.ingest_one(item).await {
                Ok(ingested) => outcome.succeeded.push(ingested),
                Err((identifier, reason)) => {
                    tracing::debug!(item = %identifier, reason = %reason, "Batch item failed");
                    outcome.push_failure(identifier, reason);
                }
            }
        }

        tracing::info!(
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Ingest batch finished"
        );

        Ok(outcome)
    }

    async fn ingest_one(&self, item: IngestItem) -> Result<IngestedAsset, (String, String)> {
        let identifier = item.original_filename.clone();
        let fail = |reason: String| (identifier.clone(), reason);

        self.validator
            .validate_all(&item.content_type, item.data.len())
            .map_err(|e| fail(e.to_string()))?;

        // Decode is the real validation; the declared content type only
        // gates obviously wrong payloads.
        let payload = item.data.clone();
        let canonical = tokio::task::spawn_blocking(move || to_canonical(&payload))
            .await
            .map_err(|e| fail(format!("Decode task failed: {}", e)))?
            .map_err(|e| fail(format!("Invalid image: {}", e)))?;

        let storage_key = generate_key(&item.original_filename);
        let file_size = canonical.data.len() as i64;

        self.storage
            .put(
                &storage_key,
                canonical.data.to_vec(),
                CANONICAL_CONTENT_TYPE,
            )
            .await
            .map_err(|e| fail(format!("Upload failed: {}", e)))?;

        let derived = atelier_processing::extract(canonical.data.clone()).await;

        let asset = self
            .catalog
            .insert(NewAsset {
                storage_key: storage_key.clone(),
                original_filename: item.original_filename.clone(),
                width: canonical.width as i32,
                height: canonical.height as i32,
                file_size,
                perceptual_hash: derived.perceptual_hash,
                dominant_color: derived.dominant_color,
                prompt: item.prompt,
                source: item.source,
                style: item.style,
                style_ref: item.style_ref,
                imported_at: Utc::now(),
            })
            .await
            .map_err(|e| {
                // The blob is already durable; the row insert is what failed.
                tracing::warn!(
                    storage_key = %storage_key,
                    error = %e,
                    "Catalog insert failed after upload, blob left orphaned"
                );
                fail(format!("Catalog insert failed: {}", e))
            })?;

        Ok(IngestedAsset {
            id: asset.id,
            storage_key: asset.storage_key,
            original_filename: asset.original_filename,
            width: asset.width,
            height: asset.height,
            perceptual_hash: asset.perceptual_hash,
            dominant_color: asset.dominant_color,
        })
    }

    /// Register objects that already exist in storage. The bytes come back
    /// down once for dimensions and derived metadata; a fetch failure is a
    /// hard per-item failure, but an undecodable object still registers
    /// with undetermined dimensions.
    #[tracing::instrument(skip(self, items, cancel), fields(batch_size = items.len()))]
    pub async fn register_batch(
        &self,
        items: Vec<RegisterItem>,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, AppError> {
        self.check_gate()?;

        if items.is_empty() {
            return Err(AppError::InvalidInput("Empty batch".to_string()));
        }

        let mut outcome = BatchOutcome::new();

        for item in items {
            if cancel.is_cancelled() {
                outcome.push_failure(&item.storage_key, "Batch cancelled");
                continue;
            }

            match self.register_one(item).await {
                Ok(ingested) => outcome.succeeded.push(ingested),
                Err((identifier, reason)) => {
                    tracing::debug!(item = %identifier, reason = %reason, "Batch item failed");
                    outcome.push_failure(identifier, reason);
                }
            }
        }

        tracing::info!(
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Register batch finished"
        );

        Ok(outcome)
    }

    async fn register_one(&self, item: RegisterItem) -> Result<IngestedAsset, (String, String)> {
        let identifier = item.storage_key.clone();
        let fail = |reason: String| (identifier.clone(), reason);

        let data = self
            .storage
            .get(&item.storage_key)
            .await
            .map_err(|e| fail(format!("Fetch failed: {}", e)))?;
        let file_size = data.len() as i64;
        let data = Bytes::from(data);

        // The object is already durable under this key; an undecodable
        // payload only means the dimensions stay undetermined (0x0) and
        // the derived metadata stays absent. Only the fetch is hard.
        let dims_input = data.clone();
        let (width, height) = match tokio::task::spawn_blocking(move || {
            atelier_processing::decode_dimensions(&dims_input)
        })
        .await
        {
            Ok(Ok(dims)) => dims,
            Ok(Err(e)) => {
                tracing::warn!(
                    storage_key = %item.storage_key,
                    error = %e,
                    "Dimensions undetermined for registered object"
                );
                (0, 0)
            }
            Err(e) => {
                tracing::warn!(
                    storage_key = %item.storage_key,
                    error = %e,
                    "Dimension decode task failed"
                );
                (0, 0)
            }
        };

        let derived = atelier_processing::extract(data).await;

        let asset = self
            .catalog
            .insert(NewAsset {
                storage_key: item.storage_key.clone(),
                original_filename: item.original_filename.clone(),
                width: width as i32,
                height: height as i32,
                file_size,
                perceptual_hash: derived.perceptual_hash,
                dominant_color: derived.dominant_color,
                prompt: item.prompt,
                source: item.source,
                style: item.style,
                style_ref: item.style_ref,
                imported_at: Utc::now(),
            })
            .await
            .map_err(|e| fail(format!("Catalog insert failed: {}", e)))?;

        Ok(IngestedAsset {
            id: asset.id,
            storage_key: asset.storage_key,
            original_filename: asset.original_filename,
            width: asset.width,
            height: asset.height,
            perceptual_hash: asset.perceptual_hash,
            dominant_color: asset.dominant_color,
        })
    }
}
