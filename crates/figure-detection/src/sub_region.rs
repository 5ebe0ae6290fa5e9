//! Individual micrographs inside a micrograph region

use micrograph_common::{Crop, RasterImage};
use micrograph_extract_core::{
    to_model_color_space, DetectorKind, ModelError, ModelFamily, ModelRegistry, StageThresholds,
};
use tracing::debug;

use crate::crop_confident;

/// Extracts the sub-images composited inside one micrograph region
#[derive(Debug, Clone)]
pub struct SubRegionExtractor {
    score_threshold: f32,
}

impl Default for SubRegionExtractor {
    fn default() -> Self {
        Self::from_thresholds(&StageThresholds::default())
    }
}

impl SubRegionExtractor {
    /// Detector class for a sub-image
    pub const SUB_IMAGE_CLASS: u32 = 0;

    #[must_use]
    pub fn new(score_threshold: f32) -> Self {
        Self { score_threshold }
    }

    #[must_use]
    pub fn from_thresholds(thresholds: &StageThresholds) -> Self {
        Self::new(thresholds.sub_region_score)
    }

    #[must_use]
    pub fn score_threshold(&self) -> f32 {
        self.score_threshold
    }

    pub fn extract_sub_images(
        &self,
        registry: &ModelRegistry,
        micrograph: &RasterImage,
    ) -> Result<Vec<Crop>, ModelError> {
        let detector = registry.detector(DetectorKind::SubRegion)?;
        let micrograph = to_model_color_space(micrograph, ModelFamily::Detector);

        let detections = detector.detect(&micrograph)?;
        let sub_images = crop_confident(
            &micrograph,
            &detections,
            Self::SUB_IMAGE_CLASS,
            self.score_threshold,
        );

        debug!(
            "Sub-region extractor: {} of {} detections kept",
            sub_images.len(),
            detections.len()
        );
        Ok(sub_images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use micrograph_common::{BoundingBox, ChannelOrder, Detection, PixelBox};
    use micrograph_extract_core::testing::{FakeLoader, ScriptedDetector};
    use micrograph_extract_core::ExtractConfig;
    use std::sync::Arc;

    fn extract(detections: Vec<Detection>) -> Vec<Crop> {
        let loader = FakeLoader::new().with_detector(
            DetectorKind::SubRegion,
            Arc::new(ScriptedDetector::new(detections)),
        );
        let registry = ModelRegistry::with_loader(ExtractConfig::default(), Arc::new(loader));
        let micrograph =
            RasterImage::from_raw(100, 100, 3, vec![0; 100 * 100 * 3], ChannelOrder::Bgr).unwrap();
        SubRegionExtractor::default()
            .extract_sub_images(&registry, &micrograph)
            .unwrap()
    }

    #[test]
    fn test_threshold_boundary() {
        let boxed = BoundingBox::new(10.0, 10.0, 40.0, 40.0);

        assert!(extract(vec![Detection::new(boxed, 0.70, 0)]).is_empty());

        let kept = extract(vec![Detection::new(boxed, 0.7001, 0)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].region, PixelBox::new(10, 10, 40, 40));
    }

    #[test]
    fn test_looser_than_panel_threshold() {
        let crops = extract(vec![
            Detection::new(BoundingBox::new(0.0, 0.0, 50.0, 50.0), 0.75, 0),
            Detection::new(BoundingBox::new(50.0, 0.0, 100.0, 50.0), 0.85, 0),
            Detection::new(BoundingBox::new(0.0, 50.0, 50.0, 100.0), 0.99, 2),
        ]);
        assert_eq!(crops.len(), 2);
        // Detector order, not score order
        assert_eq!(crops[0].region.x1, 0);
        assert_eq!(crops[1].region.x1, 50);
    }

    #[test]
    fn test_custom_threshold() {
        let thresholds = StageThresholds {
            sub_region_score: 0.8,
            ..Default::default()
        };
        assert_eq!(
            SubRegionExtractor::from_thresholds(&thresholds).score_threshold(),
            0.8
        );
    }
}
