//! Extraction configuration
//!
//! Loaded from YAML, every field optional:
//!
//! ```yaml
//! model_dir: /opt/models/vision_model
//! device: auto            # auto | cpu
//! threads: 8
//! weights:
//!   panel_detector: crop_images.onnx
//!   five_way_classifier: /abs/path/five_class_classifier.onnx
//! thresholds:
//!   panel_score: 0.9
//!   sub_region_score: 0.7
//! ```
//!
//! Environment variables `MICROGRAPH_MODEL_DIR`, `MICROGRAPH_DEVICE` and
//! `MICROGRAPH_THREADS` override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::models::{ClassifierKind, DetectorKind};

pub const ENV_MODEL_DIR: &str = "MICROGRAPH_MODEL_DIR";
pub const ENV_DEVICE: &str = "MICROGRAPH_DEVICE";
pub const ENV_THREADS: &str = "MICROGRAPH_THREADS";

/// Which execution provider to ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Accelerator when available, CPU otherwise
    #[default]
    Auto,
    Cpu,
}

impl FromStr for DevicePreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            other => Err(ConfigError::InvalidValue(format!(
                "unknown device preference '{other}' (expected auto or cpu)"
            ))),
        }
    }
}

/// Weight files, relative to `model_dir` unless absolute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightPaths {
    pub panel_detector: PathBuf,
    pub component_detector: PathBuf,
    pub sub_region_detector: PathBuf,
    pub binary_classifier: PathBuf,
    pub five_way_classifier: PathBuf,
}

impl Default for WeightPaths {
    fn default() -> Self {
        Self {
            panel_detector: PathBuf::from("crop_images.onnx"),
            component_detector: PathBuf::from("image_description.onnx"),
            sub_region_detector: PathBuf::from("TEM_image_crop.onnx"),
            binary_classifier: PathBuf::from("binary_classifier.onnx"),
            five_way_classifier: PathBuf::from("five_class_classifier.onnx"),
        }
    }
}

/// Parameters of the detector models themselves (before any stage filtering)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Square letterbox size the detectors were exported with
    pub input_size: u32,
    /// Model-level confidence floor
    pub confidence_threshold: f32,
    /// `IoU` threshold for class-aware non-maximum suppression
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
        }
    }
}

/// Classifier input pipeline: resize, scale to [0, 1], normalise per channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub input_size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            input_size: 224,
            mean: [0.5; 3],
            std: [0.5; 3],
        }
    }
}

/// Score thresholds applied by the stages (strictly greater than)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageThresholds {
    pub panel_score: f32,
    pub sub_region_score: f32,
}

impl Default for StageThresholds {
    fn default() -> Self {
        Self {
            panel_score: 0.9,
            sub_region_score: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub model_dir: PathBuf,
    pub weights: WeightPaths,
    pub device: DevicePreference,
    /// Intra-op threads per session (None = physical cores)
    pub threads: Option<usize>,
    pub detector: DetectorParams,
    pub classifier_input: PreprocessConfig,
    pub thresholds: StageThresholds,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models/vision_model"),
            weights: WeightPaths::default(),
            device: DevicePreference::default(),
            threads: None,
            detector: DetectorParams::default(),
            classifier_input: PreprocessConfig::default(),
            thresholds: StageThresholds::default(),
        }
    }
}

impl ExtractConfig {
    /// Load and validate a YAML configuration file
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: ExtractConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MICROGRAPH_*` environment overrides
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(dir) = lookup(ENV_MODEL_DIR) {
            self.model_dir = PathBuf::from(dir);
        }
        if let Some(device) = lookup(ENV_DEVICE) {
            self.device = device.parse()?;
        }
        if let Some(threads) = lookup(ENV_THREADS) {
            let threads = threads.trim().parse::<usize>().map_err(|_| {
                ConfigError::InvalidValue(format!("{ENV_THREADS} must be a number, got '{threads}'"))
            })?;
            self.threads = Some(threads);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = |name: &str, v: f32| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue(format!(
                    "{name} must be within [0, 1], got {v}"
                )))
            }
        };
        unit("thresholds.panel_score", self.thresholds.panel_score)?;
        unit("thresholds.sub_region_score", self.thresholds.sub_region_score)?;
        unit("detector.confidence_threshold", self.detector.confidence_threshold)?;
        unit("detector.iou_threshold", self.detector.iou_threshold)?;

        if self.detector.input_size == 0 || self.classifier_input.input_size == 0 {
            return Err(ConfigError::InvalidValue(
                "input sizes must be greater than zero".to_string(),
            ));
        }
        if self.classifier_input.std.iter().any(|s| *s == 0.0) {
            return Err(ConfigError::InvalidValue(
                "classifier_input.std must not contain zero".to_string(),
            ));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::InvalidValue(
                "threads must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolved weight path of a detector
    #[must_use]
    pub fn detector_path(&self, kind: DetectorKind) -> PathBuf {
        let file = match kind {
            DetectorKind::Panel => &self.weights.panel_detector,
            DetectorKind::Component => &self.weights.component_detector,
            DetectorKind::SubRegion => &self.weights.sub_region_detector,
        };
        self.resolve(file)
    }

    /// Resolved weight path of a classifier
    #[must_use]
    pub fn classifier_path(&self, kind: ClassifierKind) -> PathBuf {
        let file = match kind {
            ClassifierKind::BinaryGate => &self.weights.binary_classifier,
            ClassifierKind::FiveWay => &self.weights.five_way_classifier,
        };
        self.resolve(file)
    }

    /// Intra-op thread count for ONNX sessions
    #[must_use]
    pub fn intra_threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get_physical)
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.model_dir.join(file)
        }
    }
}
