//! Figure detection stages
//!
//! Three detector-driven stages narrow a page down to individual micrographs:
//! - [`PanelDetector`]: page -> figure panels (class 0, score > 0.9)
//! - [`ComponentSplitter`]: panel -> largest micrograph and caption regions
//! - [`SubRegionExtractor`]: micrograph region -> sub-images (class 0, score > 0.7)
//!
//! Every stage converts its input to the detector channel ordering on entry
//! and clips boxes to the image it ran on. Finding nothing is an empty result,
//! never an error.

pub mod components;
pub mod panel;
pub mod sub_region;

pub use components::{select_components, ComponentSplitter, PanelComponents};
pub use panel::PanelDetector;
pub use sub_region::SubRegionExtractor;

use micrograph_common::{Crop, Detection, RasterImage};
use tracing::debug;

/// Crop every detection of `class_id` scoring strictly above `threshold`.
///
/// Keeps detector order. Boxes that clip to nothing inside `image` are dropped.
#[must_use]
pub fn crop_confident(
    image: &RasterImage,
    detections: &[Detection],
    class_id: u32,
    threshold: f32,
) -> Vec<Crop> {
    detections
        .iter()
        .filter(|d| d.class_id == class_id && d.score > threshold)
        .filter_map(|d| match d.bbox.clip(image.width(), image.height()) {
            Some(region) => Some(image.crop(&region)),
            None => {
                debug!("Dropping detection {:?}, empty after clipping", d.bbox);
                None
            }
        })
        .collect()
}
