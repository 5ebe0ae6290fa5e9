//! Micrograph Extract Core - model registry and inference backends
//!
//! This crate owns everything the detection-and-classification cascade needs
//! from its models:
//! - [`ExtractConfig`]: weight locations, device preference, detector and
//!   classifier parameters, stage thresholds
//! - [`ModelRegistry`]: five lazily loaded, process-lifetime models behind
//!   the [`Detector`] and [`Classifier`] traits
//! - [`preprocess`]: the colour-space contract and classifier input pipeline
//! - ONNX Runtime backends for YOLO-style detectors and ResNet-style classifiers

pub mod config;
pub mod error;
pub mod image_io;
pub mod models;
pub mod onnx_utils;
pub mod preprocess;
pub mod registry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{
    DetectorParams, DevicePreference, ExtractConfig, PreprocessConfig, StageThresholds,
    WeightPaths,
};
pub use error::{ConfigError, ModelError};
pub use models::{
    Classifier, ClassifierKind, ComputeDevice, Detector, DetectorKind, ModelLoader,
    OnnxModelLoader,
};
pub use preprocess::{
    to_model_color_space, ModelFamily, ModelInput, Preprocessor, CLASSIFIER_CHANNEL_ORDER,
    DETECTOR_CHANNEL_ORDER,
};
pub use registry::ModelRegistry;
