use serde::{Deserialize, Serialize};

/// Summary of one successfully ingested asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestedAsset {
    pub id: i64,
    pub storage_key: String,
    pub original_filename: String,
    pub width: i32,
    pub height: i32,
    pub perceptual_hash: Option<String>,
    pub dominant_color: Option<String>,
}

/// One failed batch item, identified by the offending input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub identifier: String,
    pub reason: String,
}

/// Result of a batch operation. Every input item appears in exactly one of
/// the two sequences; a non-empty `failed` list is not an error, callers
/// must inspect it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub succeeded: Vec<IngestedAsset>,
    pub failed: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_failure(&mut self, identifier: impl Into<String>, reason: impl Into<String>) {
        self.failed.push(BatchFailure {
            identifier: identifier.into(),
            reason: reason.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.succeeded.is_empty() && self.failed.is_empty()
    }
}
