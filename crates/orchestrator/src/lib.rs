//! Stage sequencing for the micrograph cascade
//!
//! For each page: panels -> micrograph/caption split -> sub-images -> labels.
//! Within a page the stages run strictly in that order. Pages are independent
//! and can be fanned out over the rayon pool.
//!
//! A non-fatal model error fails only the page it happened on; the page is
//! logged and listed in [`DocumentReport::failures`]. A fatal error (model
//! load, device) aborts the document.

mod error;
mod records;

pub use error::PipelineError;
pub use records::{
    caption_ref, DocumentReport, MetadataRecord, PageExtraction, PageFailure, PanelResult,
    SubImageResult,
};

use micrograph_common::RasterImage;
use micrograph_extract_core::ModelRegistry;
use micrograph_figure_detection::{ComponentSplitter, PanelDetector, SubRegionExtractor};
use micrograph_modality_classification::ClassifierCascade;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct ExtractionPipeline {
    registry: Arc<ModelRegistry>,
    panels: PanelDetector,
    splitter: ComponentSplitter,
    sub_regions: SubRegionExtractor,
    cascade: ClassifierCascade,
}

impl ExtractionPipeline {
    /// Build the stages with the thresholds of the registry's configuration
    #[must_use]
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        let thresholds = registry.config().thresholds.clone();
        Self {
            registry,
            panels: PanelDetector::from_thresholds(&thresholds),
            splitter: ComponentSplitter::new(),
            sub_regions: SubRegionExtractor::from_thresholds(&thresholds),
            cascade: ClassifierCascade::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn process_page(
        &self,
        source_id: &str,
        page_index: usize,
        page: &RasterImage,
    ) -> Result<PageExtraction, PipelineError> {
        let registry = self.registry.as_ref();
        let fail = |e| PipelineError::page(source_id, page_index, e);

        let panels = self.panels.detect_panels(registry, page).map_err(fail)?;

        let mut results = Vec::with_capacity(panels.len());
        for panel in panels {
            let components = self
                .splitter
                .split_components(registry, &panel.image)
                .map_err(fail)?;

            let mut sub_images = Vec::new();
            if let Some(micrograph) = &components.micrograph {
                for crop in self
                    .sub_regions
                    .extract_sub_images(registry, &micrograph.image)
                    .map_err(fail)?
                {
                    let label = self.cascade.classify(registry, &crop.image).map_err(fail)?;
                    sub_images.push(SubImageResult { crop, label });
                }
            }

            results.push(PanelResult {
                panel,
                micrograph: components.micrograph,
                caption: components.caption,
                sub_images,
            });
        }

        let extraction = PageExtraction {
            source_id: source_id.to_string(),
            page_index,
            panels: results,
        };
        debug!(
            "{} page {}: {} panels, {} sub-images",
            source_id,
            page_index,
            extraction.panels.len(),
            extraction.sub_image_count()
        );
        Ok(extraction)
    }

    /// Process pages one after another
    pub fn process_document(
        &self,
        source_id: &str,
        pages: &[RasterImage],
    ) -> Result<DocumentReport, PipelineError> {
        let start = Instant::now();
        let outcomes = pages
            .iter()
            .enumerate()
            .map(|(index, page)| self.process_page(source_id, index, page));
        let report = collect_report(source_id, outcomes)?;
        log_summary(&report, start);
        Ok(report)
    }

    /// Process pages on the rayon pool; the report keeps page order
    pub fn process_document_parallel(
        &self,
        source_id: &str,
        pages: &[RasterImage],
    ) -> Result<DocumentReport, PipelineError> {
        let start = Instant::now();
        let outcomes: Vec<_> = pages
            .par_iter()
            .enumerate()
            .map(|(index, page)| self.process_page(source_id, index, page))
            .collect();
        let report = collect_report(source_id, outcomes)?;
        log_summary(&report, start);
        Ok(report)
    }
}

/// Fold page outcomes into a report, stopping at the first fatal error
fn collect_report(
    source_id: &str,
    outcomes: impl IntoIterator<Item = Result<PageExtraction, PipelineError>>,
) -> Result<DocumentReport, PipelineError> {
    let mut report = DocumentReport {
        source_id: source_id.to_string(),
        pages: Vec::new(),
        failures: Vec::new(),
    };

    for outcome in outcomes {
        match outcome {
            Ok(page) => report.pages.push(page),
            Err(e) if e.is_fatal() => return Err(e),
            Err(PipelineError::Page {
                page_index, source, ..
            }) => {
                warn!("Skipping {} page {}: {}", source_id, page_index, source);
                report.failures.push(PageFailure {
                    page_index,
                    error: source.to_string(),
                });
            }
        }
    }

    Ok(report)
}

fn log_summary(report: &DocumentReport, start: Instant) {
    info!(
        "{}: {} pages processed, {} failed, {} records in {:.2}s",
        report.source_id,
        report.pages.len(),
        report.failures.len(),
        report.records().len(),
        start.elapsed().as_secs_f64()
    );
}
