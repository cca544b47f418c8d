//! Storage key generation
//!
//! Keys partition by import year/month and embed a millisecond timestamp
//! plus a short random suffix, so two calls in the same process (even in the
//! same millisecond) produce distinct keys with overwhelming probability.
//! Generation is pure and never fails; no storage round-trip is needed.
//!
//! Key format: `images/{year}/{month}/{stem}_{millis}_{rand6}.png`

use chrono::{Datelike, Utc};
use rand::{distr::Alphanumeric, Rng};
use std::path::Path;

/// All ingested assets are re-encoded to this lossless canonical format
/// before key assignment.
pub const CANONICAL_EXTENSION: &str = "png";
pub const CANONICAL_CONTENT_TYPE: &str = "image/png";

/// Maximum length (in characters) of the sanitized filename stem.
const MAX_STEM_CHARS: usize = 50;

const RANDOM_SUFFIX_LEN: usize = 6;

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'   // CJK Unified Ideographs
        | '\u{3400}'..='\u{4DBF}' // CJK Extension A
        | '\u{3040}'..='\u{309F}' // Hiragana
        | '\u{30A0}'..='\u{30FF}' // Katakana
        | '\u{AC00}'..='\u{D7AF}' // Hangul Syllables
    )
}

/// Strip the extension and reduce the name to storage-friendly characters:
/// ASCII alphanumerics and CJK are retained, everything else becomes `_`.
fn sanitize_stem(original_name: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || is_cjk(c) {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_CHARS)
        .collect();

    if cleaned.chars().all(|c| c == '_') {
        "image".to_string()
    } else {
        cleaned
    }
}

/// Derive a unique storage key for an incoming asset from its original name.
pub fn generate_key(original_name: &str) -> String {
    let now = Utc::now();
    let stem = sanitize_stem(original_name);
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(char::from)
        .collect();

    format!(
        "images/{}/{:02}/{}_{}_{}.{}",
        now.year(),
        now.month(),
        stem,
        now.timestamp_millis(),
        suffix,
        CANONICAL_EXTENSION
    )
}
