//! Atelier Services Layer
//!
//! Orchestration over the storage, processing and catalog crates: the batch
//! ingestion pipeline, the disk thumbnail cache, and the asset lifecycle
//! manager (trash, restore, purge). Keep coordination here; the lower
//! crates stay free of cross-cutting policy.

pub mod catalog;
pub mod ingest;
pub mod lifecycle;
pub mod thumbs;

pub use catalog::CatalogService;
pub use ingest::{IngestItem, IngestService, RegisterItem};
pub use lifecycle::{LifecycleService, PurgeOutcome};
pub use thumbs::ThumbnailCache;

#[cfg(test)]
pub(crate) mod test_support;
