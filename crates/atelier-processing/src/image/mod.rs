//! Canonical normalization and thumbnail rendering.
//!
//! All ingested assets are re-encoded once to lossless PNG before storage,
//! so later transformations never compound generational loss. Thumbnails
//! are re-encoded to JPEG at a fixed quality for delivery.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;

/// Canonical (PNG) bytes plus the decoded dimensions.
pub struct CanonicalImage {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Decode image bytes, guessing the container format from content.
pub fn decode(data: &[u8]) -> Result<DynamicImage, anyhow::Error> {
    let cursor = Cursor::new(data);
    let img = ImageReader::new(cursor).with_guessed_format()?.decode()?;
    Ok(img)
}

/// Decode just far enough to learn the pixel dimensions.
pub fn decode_dimensions(data: &[u8]) -> Result<(u32, u32), anyhow::Error> {
    let img = decode(data)?;
    Ok(img.dimensions())
}

/// Decode and re-encode to the canonical lossless format, recording the
/// resulting dimensions.
pub fn to_canonical(data: &[u8]) -> Result<CanonicalImage, anyhow::Error> {
    let img = decode(data)?;
    let (width, height) = img.dimensions();

    let estimated_size = (width * height * 3) as usize;
    let mut buffer = Vec::with_capacity(estimated_size);
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;

    Ok(CanonicalImage {
        data: Bytes::from(buffer),
        width,
        height,
    })
}

/// Resize to the requested width preserving aspect ratio and re-encode as
/// JPEG at the given quality. Never upscales beyond the source width.
pub fn render_thumbnail(data: &[u8], width: u32, quality: u8) -> Result<Bytes, anyhow::Error> {
    if width == 0 {
        anyhow::bail!("Thumbnail width must be greater than 0");
    }

    let img = decode(data)?;
    let (src_w, src_h) = img.dimensions();

    let resized = if width >= src_w {
        img
    } else {
        let target_h = ((src_h as u64 * width as u64) / src_w as u64).max(1) as u32;
        img.resize_exact(width, target_h, FilterType::Lanczos3)
    };

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
    rgb.write_with_encoder(encoder)?;

    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn test_image_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_to_canonical_records_dimensions() {
        let data = test_image_bytes(800, 600);
        let canonical = to_canonical(&data).unwrap();
        assert_eq!(canonical.width, 800);
        assert_eq!(canonical.height, 600);
        assert!(!canonical.data.is_empty());

        // Canonical output decodes as PNG
        let reread = ImageReader::new(Cursor::new(canonical.data.as_ref()))
            .with_guessed_format()
            .unwrap();
        assert_eq!(reread.format(), Some(ImageFormat::Png));
    }

    #[test]
    fn test_to_canonical_rejects_garbage() {
        assert!(to_canonical(b"not an image").is_err());
    }

    #[test]
    fn test_render_thumbnail_preserves_aspect_ratio() {
        let data = test_image_bytes(800, 600);
        let thumb = render_thumbnail(&data, 256, 80).unwrap();

        let img = decode(&thumb).unwrap();
        assert_eq!(img.dimensions(), (256, 192));
    }

    #[test]
    fn test_render_thumbnail_never_upscales() {
        let data = test_image_bytes(100, 50);
        let thumb = render_thumbnail(&data, 400, 80).unwrap();

        let img = decode(&thumb).unwrap();
        assert_eq!(img.dimensions(), (100, 50));
    }

    #[test]
    fn test_render_thumbnail_is_deterministic() {
        let data = test_image_bytes(320, 240);
        let a = render_thumbnail(&data, 128, 80).unwrap();
        let b = render_thumbnail(&data, 128, 80).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_thumbnail_honors_quality_setting() {
        let mut img = RgbaImage::new(64, 64);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8, 255]);
        }
        let mut data = Vec::new();
        img.write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .unwrap();

        let low = render_thumbnail(&data, 64, 10).unwrap();
        let high = render_thumbnail(&data, 64, 95).unwrap();
        assert!(high.len() > low.len());
    }

    #[test]
    fn test_render_thumbnail_zero_width_rejected() {
        let data = test_image_bytes(100, 100);
        assert!(render_thumbnail(&data, 0, 80).is_err());
    }

    #[test]
    fn test_render_thumbnail_garbage_rejected() {
        assert!(render_thumbnail(b"garbage", 128, 80).is_err());
    }
}
