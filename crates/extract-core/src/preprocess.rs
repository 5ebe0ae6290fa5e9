//! Model input preparation
//!
//! Detector stages and the classifier cascade expect opposite channel
//! orderings. [`to_model_color_space`] is the single place that reconciles an
//! image with a model family; stages call it once on entry.

use image::imageops::{self, FilterType};
use micrograph_common::{ChannelOrder, RasterImage};
use ndarray::{Array, Array4};
use tracing::warn;

use crate::config::PreprocessConfig;

/// Ordering the detector stages hand to their models
pub const DETECTOR_CHANNEL_ORDER: ChannelOrder = ChannelOrder::Bgr;

/// Ordering the classifier cascade hands to its models (ingest-native)
pub const CLASSIFIER_CHANNEL_ORDER: ChannelOrder = ChannelOrder::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Detector,
    Classifier,
}

impl ModelFamily {
    #[must_use]
    pub fn channel_order(&self) -> ChannelOrder {
        match self {
            ModelFamily::Detector => DETECTOR_CHANNEL_ORDER,
            ModelFamily::Classifier => CLASSIFIER_CHANNEL_ORDER,
        }
    }
}

/// Return `image` in the channel ordering `family` requires.
///
/// Pure and idempotent. Images without exactly three channels pass through
/// unconverted.
#[must_use]
pub fn to_model_color_space(image: &RasterImage, family: ModelFamily) -> RasterImage {
    if !image.is_color() {
        warn!(
            "{}-channel {}x{} image passed through without channel conversion",
            image.channels(),
            image.width(),
            image.height()
        );
    }
    image.to_channel_order(family.channel_order())
}

/// Normalised `(1, 3, S, S)` classifier input
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    pub tensor: Array4<f32>,
}

/// Resize, scale to [0, 1] and normalise per channel
#[derive(Debug, Clone)]
pub struct Preprocessor {
    input_size: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::from_config(&PreprocessConfig::default())
    }
}

impl Preprocessor {
    #[must_use]
    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self {
            input_size: config.input_size,
            mean: config.mean,
            std: config.std,
        }
    }

    #[must_use]
    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Build the classifier tensor for `image`.
    ///
    /// Channel planes are laid out R, G, B whatever the image's tag says.
    #[must_use]
    pub fn preprocess(&self, image: &RasterImage) -> ModelInput {
        let size = self.input_size;
        let rgb = image.to_rgb_image();
        let resized = if rgb.dimensions() == (size, size) {
            rgb
        } else {
            imageops::resize(&rgb, size, size, FilterType::Triangle)
        };

        let mut tensor = Array::zeros((1, 3, size as usize, size as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                let value = f32::from(pixel[c]) / 255.0;
                tensor[[0, c, y, x]] = (value - self.mean[c]) / self.std[c];
            }
        }

        ModelInput { tensor }
    }
}
