// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-document — The collaborators behind every Blattwerk job.
//
// Provides page assembly over lopdf (the document library), decryption and
// recompression through a lazily started rewrite engine, page rendering
// behind a pluggable trait, and a store-only archive encoder for bundling
// multiple outputs.

pub mod archive;
pub mod pdf;
pub mod render;
pub mod rewrite;

// Re-export the primary types so callers can use `blattwerk_document::PdfReader` etc.
pub use archive::{ArchiveEntry, encode_archive, encode_archive_at};
pub use pdf::library::{DocumentLibrary, LopdfLibrary, PageSource, Pages};
pub use pdf::reader::PdfReader;
pub use pdf::writer::PdfAssembler;
pub use render::{PageSink, RenderEngine, RenderedPage, UnavailableRenderer, encode_image};
pub use rewrite::adapter::RewriteAdapter;
pub use rewrite::engine::{LopdfRewriteEngine, RewriteCommand, RewriteEngine, RewriteError};

#[cfg(feature = "pdfium")]
pub use render::pdfium::PdfiumRenderer;
