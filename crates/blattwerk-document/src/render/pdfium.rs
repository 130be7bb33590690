// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDFium-backed renderer (requires the `pdfium` feature and the PDFium shared
// library at runtime).

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use blattwerk_core::error::BlattwerkError;
use pdfium_render::prelude::*;
use tracing::{debug, info, instrument, warn};

use super::{PageSink, RenderEngine, RenderedPage};

struct PdfiumBinding(Pdfium);

// PDFium is bound once and only used through `&Pdfium`; the `thread_safe`
// feature serialises calls into the library.
unsafe impl Send for PdfiumBinding {}
unsafe impl Sync for PdfiumBinding {}

static PDFIUM: OnceLock<Result<PdfiumBinding, String>> = OnceLock::new();

/// Bind PDFium, trying `library_dir` (or the working directory) before the
/// system library. Only the first call's directory is used.
fn pdfium(library_dir: Option<&Path>) -> Result<&'static Pdfium, BlattwerkError> {
    let binding = PDFIUM.get_or_init(|| {
        let dir = library_dir.map_or_else(|| PathBuf::from("./"), Path::to_path_buf);
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
            .or_else(|local_err| {
                debug!(dir = %dir.display(), %local_err, "PDFium not found locally");
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name())
            });
        match bindings {
            Ok(bindings) => {
                info!("PDFium library bound");
                Ok(PdfiumBinding(Pdfium::new(bindings)))
            }
            Err(err) => {
                warn!(%err, "PDFium library load failed");
                Err(format!("PDFium library load failed: {}", err))
            }
        }
    });

    match binding {
        Ok(binding) => Ok(&binding.0),
        Err(err) => Err(BlattwerkError::Render(err.clone())),
    }
}

/// [`RenderEngine`] over PDFium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRenderer {
    library_dir: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }

    fn open<'a>(
        &self,
        pdfium: &'a Pdfium,
        document: &'a [u8],
    ) -> Result<PdfDocument<'a>, BlattwerkError> {
        pdfium
            .load_pdf_from_byte_slice(document, None)
            .map_err(|err| BlattwerkError::Render(format!("cannot open document: {}", err)))
    }
}

impl RenderEngine for PdfiumRenderer {
    #[instrument(skip(self, document, sink), fields(bytes_len = document.len()))]
    fn render_pages(
        &self,
        document: &[u8],
        scale: f32,
        sink: &mut PageSink<'_>,
    ) -> Result<u32, BlattwerkError> {
        let pdfium = pdfium(self.library_dir.as_deref())?;
        let doc = self.open(pdfium, document)?;
        let pages = doc.pages();
        let page_count = u32::from(pages.len());
        debug!(page_count, "Document opened for rendering");

        for (index, page) in pages.iter().enumerate() {
            let index = index as u32;
            let width = ((page.width().value * scale).round() as i32).max(1);
            let height = ((page.height().value * scale).round() as i32).max(1);
            let config = PdfRenderConfig::new()
                .set_target_width(width)
                .set_maximum_height(height);

            let bitmap = page
                .render_with_config(&config)
                .map_err(|err| BlattwerkError::Render(format!("page {}: {}", index, err)))?;
            sink(RenderedPage {
                index,
                page_count,
                image: bitmap.as_image(),
            })?;
        }
        Ok(page_count)
    }
}
