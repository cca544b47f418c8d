//! Atelier Database Library
//!
//! The asset catalog: the `Catalog` trait consumed by services and its
//! Postgres implementation (`AssetRepository`), including the filtered,
//! sorted, paginated listing engine and lifecycle row operations.

pub mod db;

pub use db::catalog::Catalog;
pub use db::repository::AssetRepository;
pub use db::{connect_pool, run_migrations};
