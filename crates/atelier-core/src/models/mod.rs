pub mod asset;
pub mod batch;
pub mod query;

pub use asset::{Asset, AssetPatch, FieldUpdate, NewAsset};
pub use batch::{BatchFailure, BatchOutcome, IngestedAsset};
pub use query::{AssetQuery, AssetView, ResolutionBucket, SortMode};
