//! PDF page rendering
//!
//! Renders every page of a document to an RGB [`RasterImage`] using
//! `pdfium-render`. A zoom of 1.0 renders at 72 dpi (one pixel per PDF point).
//!
//! The pdfium library is bound on first render, from the working directory
//! or the system library path.

use micrograph_common::RasterImage;
use once_cell::unsync::OnceCell;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Unreadable document {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Invalid zoom {0}, must be finite and greater than zero")]
    InvalidZoom(f32),

    #[error("Failed to bind pdfium library: {0}")]
    Library(String),
}

impl RenderError {
    /// Whether the error concerns this document only
    #[must_use]
    pub fn is_document_error(&self) -> bool {
        matches!(self, RenderError::NotFound(_) | RenderError::Unreadable { .. })
    }
}

/// Pixel size of a page of `width` x `height` points at `zoom`
#[must_use]
pub fn page_pixel_size(width: f32, height: f32, zoom: f32) -> (i32, i32) {
    let scale = |points: f32| ((points * zoom).round() as i32).max(1);
    (scale(width), scale(height))
}

fn validate_zoom(zoom: f32) -> Result<(), RenderError> {
    if zoom.is_finite() && zoom > 0.0 {
        Ok(())
    } else {
        Err(RenderError::InvalidZoom(zoom))
    }
}

#[derive(Default)]
pub struct PageRenderer {
    library_dir: Option<PathBuf>,
    pdfium: OnceCell<Pdfium>,
}

impl PageRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for the pdfium library in `dir` before the system path
    #[must_use]
    pub fn with_library_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: Some(dir.into()),
            pdfium: OnceCell::new(),
        }
    }

    fn pdfium(&self) -> Result<&Pdfium, RenderError> {
        self.pdfium.get_or_try_init(|| {
            let dir = self
                .library_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("./"));
            let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|e| RenderError::Library(e.to_string()))?;
            info!("Bound pdfium library");
            Ok(Pdfium::new(bindings))
        })
    }

    /// Render every page of `source_dir/file_name`, in page order
    pub fn render(
        &self,
        source_dir: &Path,
        file_name: &str,
        zoom: f32,
    ) -> Result<Vec<RasterImage>, RenderError> {
        self.render_path(&source_dir.join(file_name), zoom)
    }

    pub fn render_path(&self, path: &Path, zoom: f32) -> Result<Vec<RasterImage>, RenderError> {
        validate_zoom(zoom)?;
        if !path.is_file() {
            return Err(RenderError::NotFound(path.display().to_string()));
        }

        let unreadable = |reason: String| RenderError::Unreadable {
            path: path.display().to_string(),
            reason,
        };

        let document = self
            .pdfium()?
            .load_pdf_from_file(path, None)
            .map_err(|e| unreadable(e.to_string()))?;

        let page_count = document.pages().len();
        debug!("Rendering {} pages of {} at zoom {}", page_count, path.display(), zoom);

        let mut pages = Vec::with_capacity(page_count as usize);
        for (index, page) in document.pages().iter().enumerate() {
            let (width, height) = page_pixel_size(page.width().value, page.height().value, zoom);
            let bitmap = page
                .render_with_config(
                    &PdfRenderConfig::new()
                        .set_target_width(width)
                        .set_target_height(height)
                        .render_form_data(true)
                        .render_annotations(true),
                )
                .map_err(|e| unreadable(format!("page {index}: {e}")))?;

            let image = RasterImage::from_dynamic(bitmap.as_image())
                .map_err(|e| unreadable(format!("page {index}: {e}")))?;
            pages.push(image);
        }

        Ok(pages)
    }
}
