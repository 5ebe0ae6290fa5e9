//! Images mode - each image file is one page

use anyhow::{bail, Result};
use clap::Args;
use micrograph_common::{source_id_for, RasterImage};
use micrograph_extract_core::image_io::{is_supported_image, load_image};
use micrograph_extract_core::ExtractConfig;
use micrograph_orchestrator::{MetadataRecord, PageExtraction, PipelineError};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use super::{build_pipeline, skip_unless_fatal};
use crate::output::{print_records, OutputFormat};

#[derive(Args)]
pub struct ImagesCommand {
    /// Page or figure images (JPEG, PNG, TIFF)
    #[arg(value_name = "FILES", required = true)]
    inputs: Vec<PathBuf>,

    /// Process images in parallel
    #[arg(long)]
    parallel: bool,
}

impl ImagesCommand {
    pub fn execute(self, config: ExtractConfig, format: OutputFormat) -> Result<()> {
        let mut pages: Vec<(String, RasterImage)> = Vec::new();
        for path in &self.inputs {
            if !is_supported_image(path) {
                warn!("Skipping unsupported file: {}", path.display());
                continue;
            }
            match load_image(path) {
                Ok(image) => pages.push((source_id_for(path), image)),
                Err(e) => warn!("Skipping unreadable image {}: {}", path.display(), e),
            }
        }

        if pages.is_empty() {
            bail!("No readable input images");
        }
        info!("Processing {} images", pages.len());

        let pipeline = build_pipeline(config)?;
        let start = Instant::now();

        let run = |(source_id, image): &(String, RasterImage)| {
            pipeline.process_page(source_id, 0, image)
        };
        let outcomes: Vec<Result<PageExtraction, PipelineError>> = if self.parallel {
            pages.par_iter().map(run).collect()
        } else {
            pages.iter().map(run).collect()
        };

        let mut records: Vec<MetadataRecord> = Vec::new();
        let mut failed = 0usize;
        for ((source_id, _), outcome) in pages.iter().zip(outcomes) {
            match outcome {
                Ok(extraction) => records.extend(extraction.records()),
                Err(e) => {
                    failed += 1;
                    skip_unless_fatal(e, source_id)?;
                }
            }
        }

        print_records(&records, format)?;
        info!(
            "{} images, {} failed, {} records in {:.2}s",
            pages.len(),
            failed,
            records.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }
}
