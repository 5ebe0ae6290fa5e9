//! ResNet-style image classifier exported to ONNX
//!
//! Input: `(1, 3, S, S)` normalised RGB tensor from the [`Preprocessor`].
//! Output: `(1, num_classes)` raw logits.
//!
//! [`Preprocessor`]: crate::preprocess::Preprocessor

use ort::{session::Session, value::TensorRef};
use std::sync::Mutex;
use tracing::debug;

use super::{Classifier, ClassifierKind};
use crate::error::ModelError;
use crate::preprocess::ModelInput;

pub struct ResnetClassifier {
    kind: ClassifierKind,
    session: Mutex<Session>,
}

impl ResnetClassifier {
    #[must_use]
    pub fn new(kind: ClassifierKind, session: Session) -> Self {
        Self {
            kind,
            session: Mutex::new(session),
        }
    }
}

/// Check a logits tensor has shape `[1, expected]` and copy it out
pub(crate) fn validate_logits(
    kind: ClassifierKind,
    dims: &[usize],
    data: &[f32],
) -> Result<Vec<f32>, ModelError> {
    let expected = kind.num_classes();
    if dims != [1, expected] || data.len() != expected {
        return Err(ModelError::InvalidOutput(format!(
            "{kind} classifier produced shape {dims:?}, expected [1, {expected}]"
        )));
    }
    Ok(data.to_vec())
}

impl Classifier for ResnetClassifier {
    fn num_classes(&self) -> usize {
        self.kind.num_classes()
    }

    fn logits(&self, input: &ModelInput) -> Result<Vec<f32>, ModelError> {
        let input_tensor = TensorRef::from_array_view(input.tensor.view())?;

        let mut session = self.session.lock().map_err(|e| {
            ModelError::Inference(format!("Failed to lock {} session: {e}", self.kind))
        })?;
        let outputs = session.run(ort::inputs![input_tensor])?;

        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();

        let logits = validate_logits(self.kind, &dims, data)?;
        debug!("{} classifier logits: {:?}", self.kind, logits);
        Ok(logits)
    }
}
