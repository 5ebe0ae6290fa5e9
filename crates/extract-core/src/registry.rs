//! Process-lifetime model registry
//!
//! Each of the five models is loaded at most once, on first use or through
//! [`ModelRegistry::preload`]. Concurrent first requests for the same model
//! block on a single load. A failed load is recorded in the slot: every later
//! request gets the same error back without touching the loader again.

use micrograph_common::RasterImage;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::ExtractConfig;
use crate::error::ModelError;
use crate::models::{
    Classifier, ClassifierKind, ComputeDevice, Detector, DetectorKind, ModelLoader,
    OnnxModelLoader,
};
use crate::preprocess::{ModelInput, Preprocessor};

/// Outcome of the one load attempt a model gets
type Slot<T> = OnceCell<Result<Arc<T>, ModelError>>;

fn loaded<T: ?Sized>(slot: &Slot<T>) -> bool {
    matches!(slot.get(), Some(Ok(_)))
}

fn resolve<T: ?Sized>(outcome: &Result<Arc<T>, ModelError>) -> Result<Arc<T>, ModelError> {
    match outcome {
        Ok(model) => Ok(Arc::clone(model)),
        Err(err) => Err(err.replay()),
    }
}

pub struct ModelRegistry {
    config: ExtractConfig,
    loader: Arc<dyn ModelLoader>,
    preprocessor: Preprocessor,
    device: OnceCell<ComputeDevice>,
    detectors: [Slot<dyn Detector>; 3],
    classifiers: [Slot<dyn Classifier>; 2],
}

impl ModelRegistry {
    /// Registry backed by ONNX Runtime sessions
    #[must_use]
    pub fn new(config: ExtractConfig) -> Self {
        let loader = Arc::new(OnnxModelLoader::new(&config));
        Self::with_loader(config, loader)
    }

    #[must_use]
    pub fn with_loader(config: ExtractConfig, loader: Arc<dyn ModelLoader>) -> Self {
        let preprocessor = Preprocessor::from_config(&config.classifier_input);
        Self {
            config,
            loader,
            preprocessor,
            device: OnceCell::new(),
            detectors: [OnceCell::new(), OnceCell::new(), OnceCell::new()],
            classifiers: [OnceCell::new(), OnceCell::new()],
        }
    }

    #[must_use]
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Compute device all models run on, selected once
    pub fn device(&self) -> ComputeDevice {
        *self.device.get_or_init(|| {
            let device = self.loader.select_device(self.config.device);
            info!(
                "Selected compute device {} (preference {:?})",
                device, self.config.device
            );
            device
        })
    }

    pub fn detector(&self, kind: DetectorKind) -> Result<Arc<dyn Detector>, ModelError> {
        resolve(self.detectors[kind.index()].get_or_init(|| {
            let path = self.config.detector_path(kind);
            info!("Loading {} detector from {}", kind, path.display());
            self.loader
                .load_detector(kind, &path, self.device())
                .inspect_err(|e| error!("{} detector unavailable for this run: {}", kind, e))
        }))
    }

    pub fn classifier(&self, kind: ClassifierKind) -> Result<Arc<dyn Classifier>, ModelError> {
        resolve(self.classifiers[kind.index()].get_or_init(|| {
            let path = self.config.classifier_path(kind);
            info!("Loading {} classifier from {}", kind, path.display());
            self.loader
                .load_classifier(kind, &path, self.device())
                .inspect_err(|e| error!("{} classifier unavailable for this run: {}", kind, e))
        }))
    }

    #[must_use]
    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Shared classifier preprocessing
    #[must_use]
    pub fn preprocess(&self, image: &RasterImage) -> ModelInput {
        self.preprocessor.preprocess(image)
    }

    /// Load all five models now, stopping at the first failure
    pub fn preload(&self) -> Result<(), ModelError> {
        for kind in DetectorKind::ALL {
            self.detector(kind)?;
        }
        for kind in ClassifierKind::ALL {
            self.classifier(kind)?;
        }
        info!("All models loaded on {}", self.device());
        Ok(())
    }

    #[must_use]
    pub fn is_detector_loaded(&self, kind: DetectorKind) -> bool {
        loaded(&self.detectors[kind.index()])
    }

    #[must_use]
    pub fn is_classifier_loaded(&self, kind: ClassifierKind) -> bool {
        loaded(&self.classifiers[kind.index()])
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("model_dir", &self.config.model_dir)
            .field("device", &self.device.get())
            .field(
                "detectors_loaded",
                &self.detectors.iter().filter(|slot| loaded(slot)).count(),
            )
            .field(
                "classifiers_loaded",
                &self.classifiers.iter().filter(|slot| loaded(slot)).count(),
            )
            .finish()
    }
}
