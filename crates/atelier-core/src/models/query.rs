use serde::{Deserialize, Serialize};

/// Resolution buckets over `width * height`.
///
/// Two configured thresholds split the catalog three ways; anything below
/// the medium threshold (including tiny images) folds into `Medium`.
/// Boundaries are closed-open: a pixel count exactly equal to a threshold
/// belongs to the higher bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionBucket {
    Medium,
    High,
    Ultra,
}

impl ResolutionBucket {
    /// Classify a pixel count against the configured thresholds.
    pub fn classify(pixels: i64, medium_threshold: i64, high_threshold: i64) -> Self {
        if pixels >= high_threshold {
            ResolutionBucket::Ultra
        } else if pixels >= medium_threshold {
            ResolutionBucket::High
        } else {
            ResolutionBucket::Medium
        }
    }

    /// Half-open `[min, max)` pixel range for this bucket; `max` is `None`
    /// for the unbounded top bucket.
    pub fn pixel_range(&self, medium_threshold: i64, high_threshold: i64) -> (i64, Option<i64>) {
        match self {
            ResolutionBucket::Medium => (0, Some(medium_threshold)),
            ResolutionBucket::High => (medium_threshold, Some(high_threshold)),
            ResolutionBucket::Ultra => (high_threshold, None),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            // "low" folds into medium for the two-threshold split
            "low" | "medium" => Some(ResolutionBucket::Medium),
            "high" => Some(ResolutionBucket::High),
            "ultra" => Some(ResolutionBucket::Ultra),
            _ => None,
        }
    }
}

/// Listing sort modes. Anything unrecognized falls back to `Newest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    Newest,
    Random { seed: Option<u64> },
}

impl SortMode {
    pub fn parse(mode: &str, seed: Option<u64>) -> Self {
        match mode.to_lowercase().as_str() {
            "random" => SortMode::Random { seed },
            _ => SortMode::Newest,
        }
    }
}

impl Default for SortMode {
    fn default() -> Self {
        SortMode::Newest
    }
}

/// Which lifecycle slice a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssetView {
    /// Active assets only (`deleted_at IS NULL`)
    #[default]
    Active,
    /// Trashed assets only (`deleted_at IS NOT NULL`)
    Trash,
}

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 500;

/// Filtered, sorted, paginated catalog view. Filters compose conjunctively.
#[derive(Debug, Clone, Default)]
pub struct AssetQuery {
    /// Case-insensitive substring match over prompt, original filename and
    /// storage key.
    pub search: Option<String>,
    pub resolution: Option<ResolutionBucket>,
    pub liked_only: bool,
    pub view: AssetView,
    pub sort: SortMode,
    /// 1-indexed page number.
    pub page: i64,
    pub page_size: i64,
}

impl AssetQuery {
    pub fn new() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            ..Default::default()
        }
    }

    /// Page/page_size clamped to sane values; page numbers are 1-indexed.
    pub fn normalized(&self) -> (i64, i64) {
        let page = self.page.max(1);
        let page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        (page, page_size)
    }

    pub fn offset(&self) -> i64 {
        let (page, page_size) = self.normalized();
        (page - 1) * page_size
    }

    /// Whether any row-restricting filter is active beyond the lifecycle
    /// view. Seeded random ordering is only reproducible when this is false.
    pub fn has_filters(&self) -> bool {
        self.search.as_deref().is_some_and(|s| !s.is_empty())
            || self.resolution.is_some()
            || self.liked_only
    }
}
