//! Figure panels on a document page

use micrograph_common::{Crop, RasterImage};
use micrograph_extract_core::{
    to_model_color_space, DetectorKind, ModelError, ModelFamily, ModelRegistry, StageThresholds,
};
use tracing::debug;

use crate::crop_confident;

/// Finds figure panels on a rendered page
#[derive(Debug, Clone)]
pub struct PanelDetector {
    score_threshold: f32,
}

impl Default for PanelDetector {
    fn default() -> Self {
        Self::from_thresholds(&StageThresholds::default())
    }
}

impl PanelDetector {
    /// Detector class for "panel"
    pub const PANEL_CLASS: u32 = 0;

    #[must_use]
    pub fn new(score_threshold: f32) -> Self {
        Self { score_threshold }
    }

    #[must_use]
    pub fn from_thresholds(thresholds: &StageThresholds) -> Self {
        Self::new(thresholds.panel_score)
    }

    #[must_use]
    pub fn score_threshold(&self) -> f32 {
        self.score_threshold
    }

    /// Crop every confident panel on `page`, in detector order
    pub fn detect_panels(
        &self,
        registry: &ModelRegistry,
        page: &RasterImage,
    ) -> Result<Vec<Crop>, ModelError> {
        let detector = registry.detector(DetectorKind::Panel)?;
        let page = to_model_color_space(page, ModelFamily::Detector);

        let detections = detector.detect(&page)?;
        let panels = crop_confident(&page, &detections, Self::PANEL_CLASS, self.score_threshold);

        debug!(
            "Panel detector: {} of {} detections kept",
            panels.len(),
            detections.len()
        );
        Ok(panels)
    }
}
