//! Atelier Processing Library
//!
//! Binary image handling for the ingestion pipeline and thumbnail cache:
//! decoding and validation, canonical (lossless PNG) normalization,
//! thumbnail rendering, and best-effort derived metadata (perceptual hash,
//! dominant color).

pub mod image;
pub mod metadata;
pub mod validator;

pub use crate::image::{decode_dimensions, render_thumbnail, to_canonical, CanonicalImage};
pub use metadata::{dominant_color, extract, perceptual_hash, DerivedMetadata};
pub use validator::{MediaValidator, ValidationError};
