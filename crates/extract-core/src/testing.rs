//! Test doubles for running the cascade without model weights

use micrograph_common::{ChannelOrder, Detection, RasterImage};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::DevicePreference;
use crate::error::ModelError;
use crate::models::{
    Classifier, ClassifierKind, ComputeDevice, Detector, DetectorKind, ModelLoader,
};
use crate::preprocess::ModelInput;

/// What a scripted detector saw on one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeenImage {
    pub width: usize,
    pub height: usize,
    pub order: ChannelOrder,
}

enum Script<T> {
    Repeat(T),
    Sequence(Mutex<VecDeque<T>>),
    Fail(String),
}

impl<T: Clone + Default> Script<T> {
    fn next(&self) -> Result<T, ModelError> {
        match self {
            Script::Repeat(value) => Ok(value.clone()),
            Script::Sequence(queue) => Ok(queue
                .lock()
                .map_err(|e| ModelError::Inference(e.to_string()))?
                .pop_front()
                .unwrap_or_default()),
            Script::Fail(message) => Err(ModelError::Inference(message.clone())),
        }
    }
}

/// Detector returning canned detections
pub struct ScriptedDetector {
    script: Script<Vec<Detection>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<SeenImage>>,
}

impl ScriptedDetector {
    fn with_script(script: Script<Vec<Detection>>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Same detections on every call
    pub fn new(detections: Vec<Detection>) -> Self {
        Self::with_script(Script::Repeat(detections))
    }

    /// One entry per call, then no detections once exhausted
    pub fn sequence(responses: Vec<Vec<Detection>>) -> Self {
        Self::with_script(Script::Sequence(Mutex::new(responses.into())))
    }

    /// Every call fails with a non-fatal inference error
    pub fn failing(message: &str) -> Self {
        Self::with_script(Script::Fail(message.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SeenImage> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Detector for ScriptedDetector {
    fn detect(&self, image: &RasterImage) -> Result<Vec<Detection>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(SeenImage {
                width: image.width(),
                height: image.height(),
                order: image.order(),
            });
        }
        self.script.next()
    }
}

/// Classifier returning canned logits
pub struct ScriptedClassifier {
    num_classes: usize,
    script: Script<Vec<f32>>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new(logits: Vec<f32>) -> Self {
        Self {
            num_classes: logits.len(),
            script: Script::Repeat(logits),
            calls: AtomicUsize::new(0),
        }
    }

    /// One logit vector per call
    pub fn sequence(num_classes: usize, responses: Vec<Vec<f32>>) -> Self {
        Self {
            num_classes,
            script: Script::Sequence(Mutex::new(responses.into())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(num_classes: usize, message: &str) -> Self {
        Self {
            num_classes,
            script: Script::Fail(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for ScriptedClassifier {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn logits(&self, _input: &ModelInput) -> Result<Vec<f32>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let logits = self.script.next()?;
        if logits.len() != self.num_classes {
            return Err(ModelError::InvalidOutput(format!(
                "scripted classifier returned {} logits, expected {}",
                logits.len(),
                self.num_classes
            )));
        }
        Ok(logits)
    }
}

/// Model loader handing out pre-registered fakes and counting loads.
///
/// Kinds without a registered fake fail to load, which is fatal.
#[derive(Default)]
pub struct FakeLoader {
    detectors: HashMap<DetectorKind, Arc<dyn Detector>>,
    classifiers: HashMap<ClassifierKind, Arc<dyn Classifier>>,
    device: Option<ComputeDevice>,
    delay: Option<Duration>,
    loads: AtomicUsize,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detector(mut self, kind: DetectorKind, detector: Arc<dyn Detector>) -> Self {
        self.detectors.insert(kind, detector);
        self
    }

    pub fn with_classifier(mut self, kind: ClassifierKind, classifier: Arc<dyn Classifier>) -> Self {
        self.classifiers.insert(kind, classifier);
        self
    }

    pub fn with_device(mut self, device: ComputeDevice) -> Self {
        self.device = Some(device);
        self
    }

    /// Sleep inside every load, to widen race windows
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total successful and failed load attempts
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn begin_load(&self) {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
    }

    fn missing(kind: &str, path: &Path) -> ModelError {
        ModelError::ModelLoad {
            kind: kind.to_string(),
            path: path.display().to_string(),
            reason: "no fake registered".to_string(),
        }
    }
}

impl ModelLoader for FakeLoader {
    fn select_device(&self, _preference: DevicePreference) -> ComputeDevice {
        self.device.unwrap_or(ComputeDevice::Cpu)
    }

    fn load_detector(
        &self,
        kind: DetectorKind,
        path: &Path,
        _device: ComputeDevice,
    ) -> Result<Arc<dyn Detector>, ModelError> {
        self.begin_load();
        self.detectors
            .get(&kind)
            .cloned()
            .ok_or_else(|| Self::missing(kind.name(), path))
    }

    fn load_classifier(
        &self,
        kind: ClassifierKind,
        path: &Path,
        _device: ComputeDevice,
    ) -> Result<Arc<dyn Classifier>, ModelError> {
        self.begin_load();
        self.classifiers
            .get(&kind)
            .cloned()
            .ok_or_else(|| Self::missing(kind.name(), path))
    }
}
