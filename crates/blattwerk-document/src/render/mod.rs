// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Render module — page-to-image rasterization behind a pluggable engine, and
// encoding of the resulting images.

#[cfg(feature = "pdfium")]
pub mod pdfium;

use blattwerk_core::error::BlattwerkError;
use blattwerk_core::types::RasterFormat;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

/// One rendered page handed to a [`RenderEngine::render_pages`] sink.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 0-based page index.
    pub index: u32,
    /// Pages in the whole document.
    pub page_count: u32,
    pub image: DynamicImage,
}

/// Sink receiving pages in document order. An error stops the render.
pub type PageSink<'a> = dyn FnMut(RenderedPage) -> Result<(), BlattwerkError> + 'a;

/// Rasterizes pages of an already-decrypted PDF.
pub trait RenderEngine: Send + Sync {
    /// Open `document` once and render every page in order at `scale` pixels
    /// per PDF point, feeding each to `sink`. Returns the page count; a
    /// zero-page document never calls `sink`.
    fn render_pages(
        &self,
        document: &[u8],
        scale: f32,
        sink: &mut PageSink<'_>,
    ) -> Result<u32, BlattwerkError>;
}

/// Renderer for builds without a rendering backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableRenderer;

impl RenderEngine for UnavailableRenderer {
    fn render_pages(
        &self,
        _document: &[u8],
        _scale: f32,
        _sink: &mut PageSink<'_>,
    ) -> Result<u32, BlattwerkError> {
        Err(BlattwerkError::RenderUnavailable)
    }
}

/// Encode a rendered page. PNG is lossless; JPEG drops alpha and uses `jpeg_quality`.
pub fn encode_image(
    image: &DynamicImage,
    format: RasterFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, BlattwerkError> {
    let mut buffer = Vec::new();
    match format {
        RasterFormat::Png => {
            let mut cursor = std::io::Cursor::new(&mut buffer);
            image.write_to(&mut cursor, ImageFormat::Png).map_err(|err| {
                BlattwerkError::ImageError(format!("PNG encoding failed: {}", err))
            })?;
        }
        RasterFormat::Jpeg => {
            let rgb = image.to_rgb8();
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, jpeg_quality);
            rgb.write_with_encoder(encoder).map_err(|err| {
                BlattwerkError::ImageError(format!("JPEG encoding failed: {}", err))
            })?;
        }
    }
    debug!(format = format.label(), bytes = buffer.len(), "Page image encoded");
    Ok(buffer)
}
