//! Per-page results and the metadata tuples derived from them

use micrograph_common::{ClassificationLabel, Crop};
use serde::{Deserialize, Serialize};

/// A labelled sub-image
#[derive(Debug, Clone, PartialEq)]
pub struct SubImageResult {
    pub crop: Crop,
    pub label: ClassificationLabel,
}

/// Everything extracted from one figure panel
#[derive(Debug, Clone, PartialEq)]
pub struct PanelResult {
    pub panel: Crop,
    pub micrograph: Option<Crop>,
    pub caption: Option<Crop>,
    pub sub_images: Vec<SubImageResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageExtraction {
    pub source_id: String,
    pub page_index: usize,
    pub panels: Vec<PanelResult>,
}

/// One row for the metadata sink, per labelled sub-image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub source_id: String,
    pub page_index: usize,
    pub panel_index: usize,
    pub sub_image_index: usize,
    pub label: ClassificationLabel,
    /// Present only when the panel has a caption crop
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub caption_ref: Option<String>,
}

/// Stable identifier of a panel's caption crop
#[must_use]
pub fn caption_ref(source_id: &str, page_index: usize, panel_index: usize) -> String {
    format!("{source_id}_p{page_index}_f{panel_index}_caption")
}

impl PageExtraction {
    #[must_use]
    pub fn records(&self) -> Vec<MetadataRecord> {
        self.panels
            .iter()
            .enumerate()
            .flat_map(|(panel_index, panel)| {
                let caption = panel
                    .caption
                    .as_ref()
                    .map(|_| caption_ref(&self.source_id, self.page_index, panel_index));
                panel
                    .sub_images
                    .iter()
                    .enumerate()
                    .map(move |(sub_image_index, sub_image)| MetadataRecord {
                        source_id: self.source_id.clone(),
                        page_index: self.page_index,
                        panel_index,
                        sub_image_index,
                        label: sub_image.label,
                        caption_ref: caption.clone(),
                    })
            })
            .collect()
    }

    #[must_use]
    pub fn sub_image_count(&self) -> usize {
        self.panels.iter().map(|p| p.sub_images.len()).sum()
    }
}

/// A page that failed without stopping the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFailure {
    pub page_index: usize,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentReport {
    pub source_id: String,
    /// Successful pages, by page index
    pub pages: Vec<PageExtraction>,
    pub failures: Vec<PageFailure>,
}

impl DocumentReport {
    #[must_use]
    pub fn records(&self) -> Vec<MetadataRecord> {
        self.pages.iter().flat_map(PageExtraction::records).collect()
    }
}
