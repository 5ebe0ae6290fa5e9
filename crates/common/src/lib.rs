/// Common types and utilities for micrograph extraction
use thiserror::Error;

mod document;
mod geometry;
mod label;
mod raster;

pub use document::{source_id_for, DocumentName};
pub use geometry::{BoundingBox, Detection, PixelBox};
pub use label::{ClassificationLabel, FINE_GRAINED_LABELS};
pub use raster::{ChannelOrder, Crop, RasterImage};

/// Processing errors
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Image has no pixels: {width}x{height}x{channels}")]
    EmptyImage {
        width: usize,
        height: usize,
        channels: usize,
    },

    #[error("Pixel buffer does not match shape: {0}")]
    Shape(String),

    #[error("Invalid document name: {0}")]
    InvalidDocumentName(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageError(String),
}

impl From<image::ImageError> for ProcessingError {
    fn from(err: image::ImageError) -> Self {
        ProcessingError::ImageError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ProcessingError {
    fn from(err: ndarray::ShapeError) -> Self {
        ProcessingError::Shape(err.to_string())
    }
}

/// Result type for processing operations
pub type Result<T> = std::result::Result<T, ProcessingError>;
