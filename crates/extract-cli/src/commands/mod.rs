pub mod documents;
pub mod images;
pub mod models;

use anyhow::{Context as _, Result};
use micrograph_extract_core::{ExtractConfig, ModelRegistry};
use micrograph_orchestrator::{ExtractionPipeline, PipelineError};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// File configuration (or defaults) with environment overrides applied
pub fn load_config(path: Option<&Path>) -> Result<ExtractConfig> {
    let config = match path {
        Some(path) => ExtractConfig::from_yaml(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ExtractConfig::default(),
    };
    config
        .with_env_overrides()
        .context("Invalid MICROGRAPH_* environment override")
}

/// Load every model up front so a missing weight file fails before any work
pub fn build_pipeline(config: ExtractConfig) -> Result<ExtractionPipeline> {
    let registry = ModelRegistry::new(config);
    registry.preload().context("Failed to load models")?;
    Ok(ExtractionPipeline::new(Arc::new(registry)))
}

/// Fatal errors stop the run, anything else skips the unit of work
pub fn skip_unless_fatal(error: PipelineError, what: &str) -> Result<()> {
    if error.is_fatal() {
        return Err(error).context(format!("Aborting at {what}"));
    }
    warn!("Skipping {what}: {error}");
    Ok(())
}
