pub mod cache;

pub use cache::ThumbnailCache;
