//! Two-stage microscopy modality classification
//!
//! A binary gate first decides whether a sub-image is a micrograph at all.
//! Only sub-images that pass are sent to the five-way classifier:
//!
//! ```text
//! sub-image -> binary gate -> "None"    -> None
//!                          -> "NotNone" -> five-way -> CTEM | Diffraction | HR-TEM | SEM | STEM
//! ```

use micrograph_common::{ClassificationLabel, RasterImage};
use micrograph_extract_core::{
    to_model_color_space, ClassifierKind, ModelError, ModelFamily, ModelRegistry,
};
use tracing::debug;

/// Output ordering of the binary gate
pub const BINARY_GATE_LABELS: [&str; 2] = ["None", "NotNone"];

/// Index of the first maximum, skipping NaN. `None` when nothing is left.
///
/// NaN never wins. This differs from argmax implementations that rank NaN
/// above every number: gate logits `[NaN, 1.0]` give "NotNone" here, so the
/// sub-image goes on to the five-way model instead of being labelled None.
#[must_use]
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, value)| !value.is_nan())
        .fold(None, |best: Option<(usize, f32)>, (index, &value)| match best {
            Some((_, current)) if value <= current => best,
            _ => Some((index, value)),
        })
        .map(|(index, _)| index)
}

#[derive(Debug, Clone, Default)]
pub struct ClassifierCascade;

impl ClassifierCascade {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Label one sub-image.
    ///
    /// The five-way classifier is never run when the gate answers "None".
    pub fn classify(
        &self,
        registry: &ModelRegistry,
        sub_image: &RasterImage,
    ) -> Result<ClassificationLabel, ModelError> {
        let gate = registry.classifier(ClassifierKind::BinaryGate)?;
        let sub_image = to_model_color_space(sub_image, ModelFamily::Classifier);
        let input = registry.preprocess(&sub_image);

        let gate_logits = gate.logits(&input)?;
        let gate_index = argmax(&gate_logits).ok_or_else(|| {
            ModelError::InvalidOutput("binary gate returned no logits".to_string())
        })?;
        let gate_label = BINARY_GATE_LABELS.get(gate_index).ok_or_else(|| {
            ModelError::InvalidOutput(format!("binary gate index {gate_index} out of range"))
        })?;
        if gate_index == 0 {
            debug!("Binary gate: {gate_label}, skipping five-way classifier");
            return Ok(ClassificationLabel::None);
        }

        let five_way = registry.classifier(ClassifierKind::FiveWay)?;
        let logits = five_way.logits(&input)?;
        let index = argmax(&logits).ok_or_else(|| {
            ModelError::InvalidOutput("five-way classifier returned no logits".to_string())
        })?;
        let label = ClassificationLabel::from_fine_grained_index(index).ok_or_else(|| {
            ModelError::InvalidOutput(format!("five-way index {index} out of range"))
        })?;

        debug!("Binary gate: {gate_label}, five-way: {label}");
        Ok(label)
    }
}
