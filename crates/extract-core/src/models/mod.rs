//! Model abstractions and their ONNX Runtime implementations
//!
//! Stages never see ONNX sessions directly, they ask the registry for a
//! [`Detector`] or [`Classifier`]. A [`ModelLoader`] decides how those are
//! built, [`OnnxModelLoader`] being the production one.

mod resnet;
mod yolo;

pub use resnet::ResnetClassifier;
pub use yolo::{decode_predictions, letterbox, Letterbox, YoloDetector};

use micrograph_common::{Detection, RasterImage};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::config::{DetectorParams, DevicePreference, ExtractConfig};
use crate::error::ModelError;
use crate::onnx_utils;
use crate::preprocess::ModelInput;

/// The three detectors of the cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// Figure panels on a page (class 0 = panel)
    Panel,
    /// Micrograph vs caption inside a panel (class 0 = micrograph, 1 = caption)
    Component,
    /// Individual micrographs inside a micrograph region (class 0 = sub-image)
    SubRegion,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 3] = [
        DetectorKind::Panel,
        DetectorKind::Component,
        DetectorKind::SubRegion,
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DetectorKind::Panel => "panel",
            DetectorKind::Component => "component",
            DetectorKind::SubRegion => "sub_region",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            DetectorKind::Panel => 0,
            DetectorKind::Component => 1,
            DetectorKind::SubRegion => 2,
        }
    }
}

impl std::fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The two classifiers of the cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// None vs NotNone
    BinaryGate,
    /// CTEM, Diffraction, HR-TEM, SEM, STEM
    FiveWay,
}

impl ClassifierKind {
    pub const ALL: [ClassifierKind; 2] = [ClassifierKind::BinaryGate, ClassifierKind::FiveWay];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ClassifierKind::BinaryGate => "binary_gate",
            ClassifierKind::FiveWay => "five_way",
        }
    }

    /// Width of the logit vector the model must produce
    #[must_use]
    pub fn num_classes(&self) -> usize {
        match self {
            ClassifierKind::BinaryGate => 2,
            ClassifierKind::FiveWay => 5,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            ClassifierKind::BinaryGate => 0,
            ClassifierKind::FiveWay => 1,
        }
    }
}

impl std::fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where inference runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    Cuda,
    Cpu,
}

impl std::fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComputeDevice::Cuda => write!(f, "cuda"),
            ComputeDevice::Cpu => write!(f, "cpu"),
        }
    }
}

/// Object detector shared read-only across stages and threads
pub trait Detector: Send + Sync {
    /// Detect regions in `image`, highest score first.
    ///
    /// Boxes are in `image` pixel coordinates and are not clipped.
    fn detect(&self, image: &RasterImage) -> Result<Vec<Detection>, ModelError>;
}

/// Image classifier shared read-only across stages and threads
pub trait Classifier: Send + Sync {
    fn num_classes(&self) -> usize;

    /// Raw logits for a preprocessed input, one per class
    fn logits(&self, input: &ModelInput) -> Result<Vec<f32>, ModelError>;
}

/// Builds models for the registry
pub trait ModelLoader: Send + Sync {
    fn select_device(&self, preference: DevicePreference) -> ComputeDevice;

    fn load_detector(
        &self,
        kind: DetectorKind,
        path: &Path,
        device: ComputeDevice,
    ) -> Result<Arc<dyn Detector>, ModelError>;

    fn load_classifier(
        &self,
        kind: ClassifierKind,
        path: &Path,
        device: ComputeDevice,
    ) -> Result<Arc<dyn Classifier>, ModelError>;
}

/// Loads ONNX exports of the YOLO detectors and ResNet classifiers
#[derive(Debug, Clone)]
pub struct OnnxModelLoader {
    params: DetectorParams,
    intra_threads: usize,
}

impl OnnxModelLoader {
    #[must_use]
    pub fn new(config: &ExtractConfig) -> Self {
        Self {
            params: config.detector.clone(),
            intra_threads: config.intra_threads(),
        }
    }
}

impl ModelLoader for OnnxModelLoader {
    fn select_device(&self, preference: DevicePreference) -> ComputeDevice {
        onnx_utils::select_device(preference)
    }

    fn load_detector(
        &self,
        kind: DetectorKind,
        path: &Path,
        device: ComputeDevice,
    ) -> Result<Arc<dyn Detector>, ModelError> {
        let session = onnx_utils::create_session(path, device, self.intra_threads).map_err(
            |e| ModelError::ModelLoad {
                kind: kind.name().to_string(),
                path: path.display().to_string(),
                reason: e.to_string(),
            },
        )?;
        Ok(Arc::new(YoloDetector::new(kind, session, self.params.clone())))
    }

    fn load_classifier(
        &self,
        kind: ClassifierKind,
        path: &Path,
        device: ComputeDevice,
    ) -> Result<Arc<dyn Classifier>, ModelError> {
        let session = onnx_utils::create_session(path, device, self.intra_threads).map_err(
            |e| ModelError::ModelLoad {
                kind: kind.name().to_string(),
                path: path.display().to_string(),
                reason: e.to_string(),
            },
        )?;
        Ok(Arc::new(ResnetClassifier::new(kind, session)))
    }
}
