//! Error types for model loading, inference and configuration

use micrograph_common::ProcessingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to load {kind} model from {path}: {reason}")]
    ModelLoad {
        kind: String,
        path: String,
        reason: String,
    },

    #[error("Compute device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Invalid model output: {0}")]
    InvalidOutput(String),

    #[error("Image processing error: {0}")]
    Image(#[from] ProcessingError),
}

impl ModelError {
    /// Infrastructure failures no stage can recover from.
    ///
    /// Everything else is scoped to the image being processed.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ModelError::ModelLoad { .. } | ModelError::DeviceUnavailable(_)
        )
    }

    /// Copy of a stored error, handed to every caller of a failed model slot
    pub(crate) fn replay(&self) -> ModelError {
        match self {
            ModelError::ModelLoad { kind, path, reason } => ModelError::ModelLoad {
                kind: kind.clone(),
                path: path.clone(),
                reason: reason.clone(),
            },
            ModelError::DeviceUnavailable(device) => ModelError::DeviceUnavailable(device.clone()),
            ModelError::Inference(message) => ModelError::Inference(message.clone()),
            ModelError::InvalidOutput(message) => ModelError::InvalidOutput(message.clone()),
            ModelError::Image(err) => ModelError::Inference(err.to_string()),
        }
    }
}

impl From<ort::Error> for ModelError {
    fn from(err: ort::Error) -> Self {
        ModelError::Inference(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    InvalidValue(String),
}
