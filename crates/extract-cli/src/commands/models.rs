//! Model check - load all five models and report them

use anyhow::Result;
use micrograph_extract_core::{ClassifierKind, DetectorKind, ExtractConfig};
use serde_json::json;

use super::build_pipeline;
use crate::output::OutputFormat;

pub fn show_models(config: ExtractConfig, format: OutputFormat) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let registry = pipeline.registry();
    let config = registry.config();

    let mut models: Vec<(String, String)> = DetectorKind::ALL
        .iter()
        .map(|kind| {
            (
                format!("{kind} detector"),
                config.detector_path(*kind).display().to_string(),
            )
        })
        .collect();
    models.extend(ClassifierKind::ALL.iter().map(|kind| {
        (
            format!("{kind} classifier"),
            config.classifier_path(*kind).display().to_string(),
        )
    }));

    match format {
        OutputFormat::Jsonl => {
            for (name, path) in &models {
                println!(
                    "{}",
                    json!({ "model": name, "path": path, "device": registry.device().to_string() })
                );
            }
        }
        OutputFormat::Text => {
            println!("Device: {}", registry.device());
            for (name, path) in &models {
                println!("  {name:<24} {path}");
            }
        }
    }
    Ok(())
}
