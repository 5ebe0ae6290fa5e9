//! Documents mode - render PDFs and process every page

use anyhow::{Context as _, Result};
use clap::Args;
use micrograph_common::source_id_for;
use micrograph_extract_core::ExtractConfig;
use micrograph_page_renderer::PageRenderer;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use super::{build_pipeline, skip_unless_fatal};
use crate::output::{print_records, OutputFormat};

#[derive(Args)]
pub struct DocumentsCommand {
    /// PDF documents
    #[arg(value_name = "PDFS", required = true)]
    inputs: Vec<PathBuf>,

    /// Render resolution multiplier (1.0 = 72 dpi)
    #[arg(long, default_value = "2.0")]
    zoom: f32,

    /// Process the pages of each document in parallel
    #[arg(long)]
    parallel: bool,

    /// Directory holding the pdfium shared library
    #[arg(long, value_name = "DIR")]
    pdfium_dir: Option<PathBuf>,
}

impl DocumentsCommand {
    pub fn execute(self, config: ExtractConfig, format: OutputFormat) -> Result<()> {
        let pipeline = build_pipeline(config)?;
        let renderer = match &self.pdfium_dir {
            Some(dir) => PageRenderer::with_library_dir(dir),
            None => PageRenderer::new(),
        };

        let start = Instant::now();
        let mut processed = 0usize;
        let mut skipped = 0usize;

        for path in &self.inputs {
            let source_dir = path.parent().unwrap_or_else(|| Path::new("."));
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                warn!("Skipping path without a file name: {}", path.display());
                skipped += 1;
                continue;
            };

            let pages = match renderer.render(source_dir, file_name, self.zoom) {
                Ok(pages) => pages,
                Err(e) if e.is_document_error() => {
                    warn!("Skipping {}: {}", path.display(), e);
                    skipped += 1;
                    continue;
                }
                Err(e) => return Err(e).context("Failed to render documents"),
            };

            let source_id = source_id_for(path);
            info!("{}: {} pages", source_id, pages.len());

            let report = if self.parallel {
                pipeline.process_document_parallel(&source_id, &pages)
            } else {
                pipeline.process_document(&source_id, &pages)
            };
            match report {
                Ok(report) => {
                    print_records(&report.records(), format)?;
                    processed += 1;
                }
                Err(e) => {
                    skipped += 1;
                    skip_unless_fatal(e, &source_id)?;
                }
            }
        }

        info!(
            "{} documents processed, {} skipped in {:.2}s",
            processed,
            skipped,
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }
}
