//! Image loading
//!
//! Decoded images come out in ingest-native RGB ordering. Single-channel
//! greyscale files stay single-channel.

use micrograph_common::{ProcessingError, RasterImage};
use std::path::Path;
use tracing::debug;

/// Decode an image file (JPEG, PNG or TIFF)
pub fn load_image(path: &Path) -> Result<RasterImage, ProcessingError> {
    let decoded = image::open(path)?;
    debug!(
        "Loaded {} ({}x{}, {:?})",
        path.display(),
        decoded.width(),
        decoded.height(),
        decoded.color()
    );
    RasterImage::from_dynamic(decoded)
}

/// Whether `path` has an extension this crate can decode
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            matches!(
                ext.to_ascii_lowercase().as_str(),
                "jpg" | "jpeg" | "png" | "tif" | "tiff"
            )
        })
        .unwrap_or(false)
}
