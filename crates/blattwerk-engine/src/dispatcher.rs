// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operation dispatcher.
//
// Each operation validates its input before touching a collaborator, then
// decrypts, transforms, and (for multi-file output) packages. Collaborator
// calls are blocking and run on the blocking pool one at a time, so a job
// awaits each step in sequence.

use std::collections::HashSet;
use std::sync::Arc;

use blattwerk_core::config::EngineConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::pages::{PageSelection, range_label};
use blattwerk_core::protocol::{InputDocument, JobRequest};
use blattwerk_core::types::{
    ARCHIVE_MEDIA_TYPE, CompressionTier, ExtractMode, PDF_MEDIA_TYPE, RasterFormat,
};
use blattwerk_document::{
    ArchiveEntry, DocumentLibrary, LopdfLibrary, PageSource, RenderEngine, RenderedPage,
    RewriteAdapter,
    encode_archive, encode_image,
};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use crate::progress::{Phase, ProgressReporter};

/// PDF user space is 72 points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Decrypting inputs.
const IMPORT: Phase = Phase::new(10, 70);
/// Building or rendering outputs.
const BUILD: Phase = Phase::new(70, 95);
/// Rendering pages, which dominates a rasterize job.
const RENDER: Phase = Phase::new(20, 90);

/// The single output of a finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutput {
    pub name: String,
    pub payload: Vec<u8>,
    pub media_type: String,
}

impl JobOutput {
    fn pdf(name: String, payload: Vec<u8>) -> Self {
        Self {
            name,
            payload,
            media_type: PDF_MEDIA_TYPE.to_string(),
        }
    }

    fn archive(name: String, payload: Vec<u8>) -> Self {
        Self {
            name,
            payload,
            media_type: ARCHIVE_MEDIA_TYPE.to_string(),
        }
    }
}

/// Runs one request against the document collaborators.
pub struct Dispatcher {
    rewrite: Arc<RewriteAdapter>,
    library: Arc<dyn DocumentLibrary>,
    renderer: Arc<dyn RenderEngine>,
    config: EngineConfig,
}

impl Dispatcher {
    pub fn new(
        rewrite: Arc<RewriteAdapter>,
        library: Arc<dyn DocumentLibrary>,
        renderer: Arc<dyn RenderEngine>,
        config: EngineConfig,
    ) -> Self {
        Self {
            rewrite,
            library,
            renderer,
            config,
        }
    }

    /// The production wiring: the process-wide rewrite adapter, lopdf, and
    /// the renderer this build supports.
    pub fn from_config(config: EngineConfig) -> Self {
        Self::new(
            RewriteAdapter::shared(&config),
            Arc::new(LopdfLibrary),
            default_renderer(&config),
            config,
        )
    }

    /// Run `request` to completion, reporting progress along the way.
    ///
    /// The terminal event is left to the caller.
    #[instrument(skip_all, fields(job_id = %request.job_id(), op = request.kind().label()))]
    pub async fn dispatch(
        &self,
        request: JobRequest,
        progress: &mut ProgressReporter,
    ) -> Result<JobOutput> {
        let output = match request {
            JobRequest::Combine { documents, .. } => self.combine(documents, progress).await?,
            JobRequest::Extract {
                document,
                pages,
                groups,
                mode,
                ..
            } => {
                let selection = PageSelection::from_request(&pages, &groups);
                self.extract(document, selection, mode, progress).await?
            }
            JobRequest::Shrink { document, tier, .. } => {
                self.shrink(document, tier, progress).await?
            }
            JobRequest::Rasterize {
                document,
                format,
                dpi,
                ..
            } => self.rasterize(document, format, dpi, progress).await?,
        };

        progress.report(100, "Done");
        info!(output = %output.name, bytes = output.payload.len(), "Job finished");
        Ok(output)
    }

    // -- Operations -----------------------------------------------------------

    async fn combine(
        &self,
        documents: Vec<InputDocument>,
        progress: &mut ProgressReporter,
    ) -> Result<JobOutput> {
        if documents.len() < 2 {
            return Err(BlattwerkError::Validation(format!(
                "combining needs at least two documents, got {}",
                documents.len()
            )));
        }
        progress.report(IMPORT.start / 2, "Starting combine");

        let total = documents.len();
        let mut sources = Vec::with_capacity(total);
        for (index, document) in documents.into_iter().enumerate() {
            let plain = self.decrypt(document.bytes, document.password.as_deref()).await?;
            sources.push(PageSource::all(plain));
            progress.step(IMPORT, index + 1, total, format!("Imported {}", document.name));
        }

        progress.report(BUILD.start, "Writing combined document");
        let library = Arc::clone(&self.library);
        let payload = blocking("assemble", move || library.assemble(&sources)).await?;
        Ok(JobOutput::pdf("combined.pdf".to_string(), payload))
    }

    async fn extract(
        &self,
        document: InputDocument,
        selection: PageSelection,
        mode: ExtractMode,
        progress: &mut ProgressReporter,
    ) -> Result<JobOutput> {
        if selection.is_empty() {
            return Err(BlattwerkError::Validation(
                "no pages selected for extraction".to_string(),
            ));
        }
        progress.report(IMPORT.start / 2, "Starting extract");

        let stem = document_stem(&document.name);
        let plain: Arc<[u8]> =
            Arc::from(self.decrypt(document.bytes, document.password.as_deref()).await?);
        progress.report(IMPORT.end / 2, "Document opened");

        let page_count = {
            let library = Arc::clone(&self.library);
            let plain = Arc::clone(&plain);
            blocking("page count", move || library.page_count(&plain)).await?
        };
        let selection = selection.clamp_to(page_count);
        if selection.is_empty() {
            return Err(BlattwerkError::Validation(format!(
                "none of the selected pages exist in this {page_count}-page document"
            )));
        }
        debug!(page_count, selected = selection.pages.len(), ?mode, "Selection resolved");
        progress.report(IMPORT.end, "Pages selected");

        match mode {
            ExtractMode::Single => {
                let source = PageSource::only(Arc::clone(&plain), selection.pages);
                let library = Arc::clone(&self.library);
                let payload = blocking("assemble", move || library.assemble(&[source])).await?;
                Ok(JobOutput::pdf(format!("{stem}-extract.pdf"), payload))
            }
            ExtractMode::Archive => {
                let groups = selection.output_groups();
                let total = groups.len();
                let mut names = UniqueNames::default();
                let mut entries = Vec::with_capacity(total);
                for (index, group) in groups.into_iter().enumerate() {
                    let label = range_label(&group);
                    let source = PageSource::only(Arc::clone(&plain), group);
                    let library = Arc::clone(&self.library);
                    let data = blocking("assemble", move || library.assemble(&[source])).await?;
                    let name = names.claim(&format!("{stem}_{label}"), "pdf");
                    entries.push(ArchiveEntry::new(name, data));
                    progress.step(BUILD, index + 1, total, format!("Built {label}"));
                }
                let payload = blocking("archive", move || encode_archive(&entries)).await?;
                Ok(JobOutput::archive(format!("{stem}-ranges.zip"), payload))
            }
        }
    }

    async fn shrink(
        &self,
        document: InputDocument,
        tier: CompressionTier,
        progress: &mut ProgressReporter,
    ) -> Result<JobOutput> {
        progress.report(IMPORT.start / 2, "Starting shrink");
        let stem = document_stem(&document.name);
        let plain = self.decrypt(document.bytes, document.password.as_deref()).await?;
        progress.report(IMPORT.end / 2, "Document opened");

        let payload = self.rewrite.recompress(plain, tier).await?;
        progress.report(BUILD.end, "Recompressed");
        Ok(JobOutput::pdf(format!("{stem}-compressed.pdf"), payload))
    }

    async fn rasterize(
        &self,
        document: InputDocument,
        format: RasterFormat,
        dpi: u32,
        progress: &mut ProgressReporter,
    ) -> Result<JobOutput> {
        if !self.config.accepts_dpi(dpi) {
            return Err(BlattwerkError::Validation(format!(
                "resolution {} dpi is outside {}..={}",
                dpi, self.config.min_dpi, self.config.max_dpi
            )));
        }
        progress.report(IMPORT.start / 2, "Starting rasterize");

        let stem = document_stem(&document.name);
        let plain: Arc<[u8]> =
            Arc::from(self.decrypt(document.bytes, document.password.as_deref()).await?);
        progress.report(IMPORT.start, "Document opened");

        let scale = dpi as f32 / POINTS_PER_INCH;
        let quality = self.config.jpeg_quality;
        let (rendered_tx, mut rendered) = mpsc::unbounded_channel::<(u32, u32)>();
        let renderer = Arc::clone(&self.renderer);
        let render = blocking("render", move || {
            let mut entries = Vec::new();
            let page_count = renderer.render_pages(&plain, scale, &mut |page: RenderedPage| {
                let data = encode_image(&page.image, format, quality)?;
                let number = page.index + 1;
                let width = page_index_width(page.page_count);
                entries.push(ArchiveEntry::new(
                    format!("page-{number:0width$}.{}", format.extension()),
                    data,
                ));
                // The job only stops listening once this task has returned.
                let _ = rendered_tx.send((number, page.page_count));
                Ok(())
            })?;
            Ok((page_count, entries))
        });
        tokio::pin!(render);

        let mut step = |(number, page_count): (u32, u32)| {
            progress.step(
                RENDER,
                number as usize,
                page_count as usize,
                format!("Rendered page {number}"),
            );
        };
        let outcome = loop {
            tokio::select! {
                Some(page) = rendered.recv() => step(page),
                outcome = &mut render => break outcome,
            }
        };
        while let Ok(page) = rendered.try_recv() {
            step(page);
        }
        let (page_count, entries) = outcome?;
        if page_count == 0 {
            return Err(BlattwerkError::Validation(
                "document has no pages to rasterize".to_string(),
            ));
        }
        debug!(page_count, "Pages rendered");

        progress.report(RENDER.end, "Packaging images");
        let payload = blocking("archive", move || encode_archive(&entries)).await?;
        Ok(JobOutput::archive(format!("{stem}-{}.zip", format.label()), payload))
    }

    // -- Helpers --------------------------------------------------------------

    async fn decrypt(&self, bytes: Vec<u8>, password: Option<&str>) -> Result<Vec<u8>> {
        self.rewrite.decrypt(bytes, password).await
    }
}

/// Renderer for this build: PDFium when compiled in, otherwise a stub that
/// fails every rasterize job.
#[cfg(feature = "pdfium")]
fn default_renderer(config: &EngineConfig) -> Arc<dyn RenderEngine> {
    Arc::new(blattwerk_document::PdfiumRenderer::new(
        config.pdfium_library_path.clone(),
    ))
}

#[cfg(not(feature = "pdfium"))]
fn default_renderer(_config: &EngineConfig) -> Arc<dyn RenderEngine> {
    Arc::new(blattwerk_document::UnavailableRenderer)
}

/// Run a blocking collaborator call off the async workers.
async fn blocking<T, F>(what: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| BlattwerkError::Internal(format!("{what} task aborted: {err}")))?
}

/// Display name without a trailing `.pdf`, safe to embed in file names.
fn document_stem(name: &str) -> String {
    let trimmed = name.trim();
    let without_ext = match trimmed.len().checked_sub(4) {
        Some(cut)
            if trimmed.is_char_boundary(cut) && trimmed[cut..].eq_ignore_ascii_case(".pdf") =>
        {
            &trimmed[..cut]
        }
        _ => trimmed,
    };
    let stem: String = without_ext
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    if stem.is_empty() {
        "document".to_string()
    } else {
        stem
    }
}

/// Digits in the page total, at least three.
fn page_index_width(page_count: u32) -> usize {
    (page_count.checked_ilog10().unwrap_or(0) as usize + 1).max(3)
}

/// Hands out archive entry names, suffixing repeats: `a.pdf`, `a_2.pdf`, ...
#[derive(Default)]
struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    fn claim(&mut self, base: &str, extension: &str) -> String {
        let mut candidate = format!("{base}.{extension}");
        let mut n = 2;
        while !self.taken.insert(candidate.clone()) {
            candidate = format!("{base}_{n}.{extension}");
            n += 1;
        }
        candidate
    }
}
