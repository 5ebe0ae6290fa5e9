//! Micrograph / caption split of a figure panel

use micrograph_common::{Crop, Detection, PixelBox, RasterImage};
use micrograph_extract_core::{
    to_model_color_space, DetectorKind, ModelError, ModelFamily, ModelRegistry,
};
use tracing::debug;

/// Detector class for the micrograph region
pub const MICROGRAPH_CLASS: u32 = 0;
/// Detector class for the caption text
pub const CAPTION_CLASS: u32 = 1;

/// The two regions of a panel, either may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelComponents {
    pub micrograph: Option<Crop>,
    pub caption: Option<Crop>,
}

/// Pick the largest clipped box per class.
///
/// A candidate replaces the current best only with strictly greater area, so
/// the earlier detection wins a tie. Boxes that clip to nothing never qualify.
#[must_use]
pub fn select_components(
    detections: &[Detection],
    width: usize,
    height: usize,
) -> (Option<PixelBox>, Option<PixelBox>) {
    let mut micrograph: (Option<PixelBox>, u64) = (None, 0);
    let mut caption: (Option<PixelBox>, u64) = (None, 0);

    for detection in detections {
        let best = match detection.class_id {
            MICROGRAPH_CLASS => &mut micrograph,
            CAPTION_CLASS => &mut caption,
            _ => continue,
        };
        let Some(region) = detection.bbox.clip(width, height) else {
            continue;
        };
        if region.area() > best.1 {
            *best = (Some(region), region.area());
        }
    }

    (micrograph.0, caption.0)
}

/// Splits a panel into its micrograph and caption
#[derive(Debug, Clone, Default)]
pub struct ComponentSplitter;

impl ComponentSplitter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub fn split_components(
        &self,
        registry: &ModelRegistry,
        panel: &RasterImage,
    ) -> Result<PanelComponents, ModelError> {
        let detector = registry.detector(DetectorKind::Component)?;
        let panel = to_model_color_space(panel, ModelFamily::Detector);

        let detections = detector.detect(&panel)?;
        let (micrograph, caption) = select_components(&detections, panel.width(), panel.height());

        debug!(
            "Component splitter: {} detections, micrograph {:?}, caption {:?}",
            detections.len(),
            micrograph,
            caption
        );

        Ok(PanelComponents {
            micrograph: micrograph.map(|region| panel.crop(&region)),
            caption: caption.map(|region| panel.crop(&region)),
        })
    }
}
