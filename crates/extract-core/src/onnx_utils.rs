//! ONNX Runtime utilities for model loading
//!
//! Sessions are created with full graph optimisations, a fixed intra-op thread
//! count and an execution-provider list chosen from the selected
//! [`ComputeDevice`].

use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::DevicePreference;
use crate::models::ComputeDevice;

/// Error type for ONNX operations
#[derive(Debug, thiserror::Error)]
pub enum OnnxError {
    #[error("Failed to create session builder: {0}")]
    SessionBuilderError(String),

    #[error("Failed to load ONNX model from {path}: {error}")]
    ModelLoadError { path: String, error: String },

    #[error("Model file not found: {0}")]
    ModelNotFound(String),
}

/// Pick the compute device for a preference.
///
/// `Auto` resolves to CUDA only when the provider reports itself available.
#[must_use]
pub fn select_device(preference: DevicePreference) -> ComputeDevice {
    match preference {
        DevicePreference::Cpu => ComputeDevice::Cpu,
        DevicePreference::Auto => match CUDAExecutionProvider::default().is_available() {
            Ok(true) => ComputeDevice::Cuda,
            Ok(false) => ComputeDevice::Cpu,
            Err(e) => {
                debug!("CUDA availability check failed, using CPU: {e}");
                ComputeDevice::Cpu
            }
        },
    }
}

/// Create an optimized ONNX Runtime session on `device`.
///
/// CUDA sessions still register the CPU provider, ONNX Runtime assigns any
/// node the accelerator cannot run to it.
pub fn create_session(
    model_path: &Path,
    device: ComputeDevice,
    intra_threads: usize,
) -> Result<Session, OnnxError> {
    if !model_path.exists() {
        return Err(OnnxError::ModelNotFound(model_path.display().to_string()));
    }

    let start = Instant::now();

    let providers = match device {
        ComputeDevice::Cuda => vec![
            CUDAExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ],
        ComputeDevice::Cpu => vec![CPUExecutionProvider::default().build()],
    };

    let session = Session::builder()
        .map_err(|e| OnnxError::SessionBuilderError(e.to_string()))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| OnnxError::SessionBuilderError(e.to_string()))?
        .with_intra_threads(intra_threads)
        .map_err(|e| OnnxError::SessionBuilderError(e.to_string()))?
        .with_memory_pattern(true)
        .map_err(|e| OnnxError::SessionBuilderError(e.to_string()))?
        .with_execution_providers(providers)
        .map_err(|e| OnnxError::SessionBuilderError(e.to_string()))?
        .commit_from_file(model_path)
        .map_err(|e| OnnxError::ModelLoadError {
            path: model_path.display().to_string(),
            error: e.to_string(),
        })?;

    info!(
        "ONNX session for {} ready on {} in {:.3}s",
        model_path.display(),
        device,
        start.elapsed().as_secs_f64()
    );

    Ok(session)
}
