use micrograph_extract_core::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{source_id} page {page_index}: {source}")]
    Page {
        source_id: String,
        page_index: usize,
        #[source]
        source: ModelError,
    },
}

impl PipelineError {
    pub(crate) fn page(source_id: &str, page_index: usize, source: ModelError) -> Self {
        PipelineError::Page {
            source_id: source_id.to_string(),
            page_index,
            source,
        }
    }

    /// True when the run cannot continue (model load or device failure)
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            PipelineError::Page { source, .. } => source.is_fatal(),
        }
    }
}
