//! Raster images with an explicit channel-order tag.
//!
//! Two conventions coexist: ingest code (decoders, the page renderer) produces
//! RGB, while the detector stages expect BGR. Every image carries its ordering
//! so conversions are explicit and idempotent instead of toggled per call site.

use image::{DynamicImage, Rgb, RgbImage};
use ndarray::{s, Array3, ArrayView3};
use serde::{Deserialize, Serialize};

use crate::{PixelBox, ProcessingError, Result};

/// Order of the colour samples in a 3-channel pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

impl std::fmt::Display for ChannelOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelOrder::Rgb => write!(f, "rgb"),
            ChannelOrder::Bgr => write!(f, "bgr"),
        }
    }
}

/// Height x width x channels array of 8-bit samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pixels: Array3<u8>,
    order: ChannelOrder,
}

impl RasterImage {
    /// Wrap a `(height, width, channels)` array.
    ///
    /// Rejects arrays with a zero-length axis.
    pub fn new(pixels: Array3<u8>, order: ChannelOrder) -> Result<Self> {
        let (height, width, channels) = pixels.dim();
        if height == 0 || width == 0 || channels == 0 {
            return Err(ProcessingError::EmptyImage {
                width,
                height,
                channels,
            });
        }
        Ok(Self { pixels, order })
    }

    /// Build from an interleaved row-major buffer
    pub fn from_raw(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u8>,
        order: ChannelOrder,
    ) -> Result<Self> {
        let pixels = Array3::from_shape_vec((height, width, channels), data)?;
        Self::new(pixels, order)
    }

    /// Take ownership of an RGB buffer (ingest-native ordering)
    pub fn from_rgb(image: RgbImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::from_raw(
            width as usize,
            height as usize,
            3,
            image.into_raw(),
            ChannelOrder::Rgb,
        )
    }

    /// Convert a decoded image, keeping single-channel greyscale as one channel
    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        match image {
            DynamicImage::ImageLuma8(gray) => {
                let (width, height) = gray.dimensions();
                Self::from_raw(
                    width as usize,
                    height as usize,
                    1,
                    gray.into_raw(),
                    ChannelOrder::Rgb,
                )
            }
            other => Self::from_rgb(other.to_rgb8()),
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    #[must_use]
    pub fn channels(&self) -> usize {
        self.pixels.dim().2
    }

    #[must_use]
    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    /// True for the regular 3-channel colour layout
    #[must_use]
    pub fn is_color(&self) -> bool {
        self.channels() == 3
    }

    #[must_use]
    pub fn pixels(&self) -> ArrayView3<'_, u8> {
        self.pixels.view()
    }

    /// Return a copy in `target` ordering.
    ///
    /// Converting to the current ordering is the identity. Images that are not
    /// 3-channel are returned unchanged, tag included.
    #[must_use]
    pub fn to_channel_order(&self, target: ChannelOrder) -> RasterImage {
        if !self.is_color() || self.order == target {
            return self.clone();
        }
        let mut pixels = self.pixels.clone();
        for mut pixel in pixels.rows_mut() {
            pixel.swap(0, 2);
        }
        RasterImage {
            pixels,
            order: target,
        }
    }

    /// Copy the pixels inside `region`; the crop keeps this image's ordering.
    ///
    /// `region` must lie inside the image (see [`crate::BoundingBox::clip`]).
    #[must_use]
    pub fn crop(&self, region: &PixelBox) -> Crop {
        let view = self.pixels.slice(s![
            region.y1 as usize..region.y2 as usize,
            region.x1 as usize..region.x2 as usize,
            ..
        ]);
        Crop {
            image: RasterImage {
                pixels: view.to_owned(),
                order: self.order,
            },
            region: *region,
        }
    }

    /// Render as an RGB buffer, honouring the ordering tag.
    ///
    /// 1- and 2-channel images replicate their first plane; images with more
    /// than three channels use the first three.
    #[must_use]
    pub fn to_rgb_image(&self) -> RgbImage {
        let channels = self.channels();
        RgbImage::from_fn(self.width() as u32, self.height() as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            if channels < 3 {
                let v = self.pixels[[y, x, 0]];
                return Rgb([v, v, v]);
            }
            let (a, b, c) = (
                self.pixels[[y, x, 0]],
                self.pixels[[y, x, 1]],
                self.pixels[[y, x, 2]],
            );
            match self.order {
                ChannelOrder::Rgb => Rgb([a, b, c]),
                ChannelOrder::Bgr => Rgb([c, b, a]),
            }
        })
    }
}

/// Independent copy of a region cut from a parent image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crop {
    pub image: RasterImage,
    /// Region in the parent's pixel coordinates
    pub region: PixelBox,
}
