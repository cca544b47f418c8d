//! Atelier Storage Library
//!
//! Storage abstraction and implementations for the asset pipeline: the
//! `Storage` trait plus S3 (via `object_store`) and local filesystem
//! backends.
//!
//! # Storage key format
//!
//! Keys are generated once at ingestion time by the `keys` module and never
//! recycled: `images/{year}/{month}/{stem}_{millis}_{rand6}.png`. Keys must
//! not contain `..` or a leading `/`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use atelier_core::config::StorageBackend;
pub use factory::create_storage;
pub use keys::{generate_key, CANONICAL_CONTENT_TYPE, CANONICAL_EXTENSION};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
