use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use std::time::Duration;

/// Per-call deadline for bucket operations.
const OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        // Build AmazonS3 object store from environment and explicit settings.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage { store, bucket })
    }

    fn map_error(key: &str, e: ObjectStoreError) -> StorageError {
        match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            // Rejected credentials never recover on retry
            e @ (ObjectStoreError::Unauthenticated { .. }
            | ObjectStoreError::PermissionDenied { .. }) => {
                StorageError::PermissionDenied(e.to_string())
            }
            other => StorageError::BackendError(other.to_string()),
        }
    }

    /// Run a bucket operation with a bounded timeout and a single retry for
    /// transient transport errors. Permanent errors (not-found, invalid key)
    /// propagate immediately.
    async fn with_retry<T, F, Fut>(&self, key: &str, op_name: &str, mut op: F) -> StorageResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ObjectResult<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(OPERATION_TIMEOUT, op()).await {
                Ok(r) => r.map_err(|e| Self::map_error(key, e)),
                Err(_) => Err(StorageError::BackendError(format!(
                    "{} timed out after {:?}",
                    op_name, OPERATION_TIMEOUT
                ))),
            };

            match result {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt == 1 => {
                    tracing::warn!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %key,
                        "S3 {} failed, retrying once",
                        op_name
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        let size = data.len() as u64;
        let bytes = Bytes::from(data);
        let location = Path::from(storage_key.to_string());
        let options = content_type_options(content_type);
        let start = std::time::Instant::now();

        self.with_retry(storage_key, "put", || {
            self.store
                .put_opts(&location, PutPayload::from(bytes.clone()), options.clone())
        })
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        let result = self
            .with_retry(storage_key, "get", || self.store.get(&location))
            .await?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;
        let size = bytes.len() as u64;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(bytes.to_vec())
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        match self
            .with_retry(storage_key, "delete", || self.store.delete(&location))
            .await
        {
            Ok(()) | Err(StorageError::NotFound(_)) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn delete_many(&self, storage_keys: &[String]) -> StorageResult<usize> {
        let start = std::time::Instant::now();

        let results = join_all(storage_keys.iter().map(|key| self.delete(key))).await;

        let mut deleted = 0;
        for (key, result) in storage_keys.iter().zip(results) {
            match result {
                Ok(()) => deleted += 1,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %key,
                        "S3 bulk delete: skipping failed key"
                    );
                }
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            requested = storage_keys.len(),
            deleted,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 bulk delete finished"
        );

        Ok(deleted)
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let location = Path::from(storage_key.to_string());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

/// Put options carrying the object's content type, so the bucket serves it
/// back with the right `Content-Type` header.
fn content_type_options(content_type: &str) -> PutOptions {
    let mut attributes = Attributes::new();
    attributes.insert(Attribute::ContentType, content_type.to_string().into());
    PutOptions::from(attributes)
}
