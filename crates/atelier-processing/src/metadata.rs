//! Derived metadata extraction
//!
//! Both extractors are cosmetic, best-effort enrichments: ingestion must
//! never fail because one of them did, so failures are swallowed here and
//! surface only as an absent value.

use crate::image::decode;
use bytes::Bytes;
use image::GenericImageView;

/// Downsample grid bound for the perceptual hash.
const HASH_MAX_DIM: u32 = 32;
/// Horizontal / vertical detail bands of the hash encoding.
const HASH_COMPONENTS_X: u32 = 4;
const HASH_COMPONENTS_Y: u32 = 3;

/// Best-effort perceptual summaries of one image.
#[derive(Debug, Clone, Default)]
pub struct DerivedMetadata {
    pub perceptual_hash: Option<String>,
    pub dominant_color: Option<String>,
}

fn compute_perceptual_hash(data: &[u8]) -> Result<String, anyhow::Error> {
    let img = decode(data)?;
    // Small grid, aspect ratio preserved, explicit alpha channel
    let small = img.thumbnail(HASH_MAX_DIM, HASH_MAX_DIM);
    let rgba = small.to_rgba8();
    let (width, height) = rgba.dimensions();

    let hash = blurhash::encode(
        HASH_COMPONENTS_X,
        HASH_COMPONENTS_Y,
        width,
        height,
        rgba.as_raw(),
    )
    .map_err(|e| anyhow::anyhow!("blurhash encoding failed: {}", e))?;

    Ok(hash)
}

/// Compact frequency-domain summary usable as an instant blurred preview.
/// Returns `None` on any decode or encoding error.
pub fn perceptual_hash(data: &[u8]) -> Option<String> {
    match compute_perceptual_hash(data) {
        Ok(hash) => Some(hash),
        Err(e) => {
            tracing::warn!(error = %e, "Perceptual hash extraction failed");
            None
        }
    }
}

fn compute_dominant_color(data: &[u8]) -> Result<String, anyhow::Error> {
    let img = decode(data)?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        anyhow::bail!("empty image");
    }

    // Per-channel mode over the full image
    let mut histograms = [[0u32; 256]; 3];
    for (_, _, pixel) in img.pixels() {
        for channel in 0..3 {
            histograms[channel][pixel.0[channel] as usize] += 1;
        }
    }

    let dominant: Vec<usize> = histograms
        .iter()
        .map(|hist| {
            hist.iter()
                .enumerate()
                .max_by_key(|(_, count)| **count)
                .map(|(value, _)| value)
                .unwrap_or(0)
        })
        .collect();

    Ok(format!(
        "#{:02x}{:02x}{:02x}",
        dominant[0], dominant[1], dominant[2]
    ))
}

/// Most representative color of the image as a zero-padded `#rrggbb` hex
/// triplet. Returns `None` on any processing error.
pub fn dominant_color(data: &[u8]) -> Option<String> {
    match compute_dominant_color(data) {
        Ok(color) => Some(color),
        Err(e) => {
            tracing::warn!(error = %e, "Dominant color extraction failed");
            None
        }
    }
}

/// Run both extractors concurrently over the same pixel buffer.
///
/// Each performs a full decode pass, so they are dispatched to the blocking
/// pool and joined; either may come back absent without affecting the other.
pub async fn extract(data: Bytes) -> DerivedMetadata {
    let hash_input = data.clone();
    let color_input = data;

    let hash_task = tokio::task::spawn_blocking(move || perceptual_hash(&hash_input));
    let color_task = tokio::task::spawn_blocking(move || dominant_color(&color_input));

    let (hash, color) = tokio::join!(hash_task, color_task);

    DerivedMetadata {
        perceptual_hash: hash.ok().flatten(),
        dominant_color: color.ok().flatten(),
    }
}
