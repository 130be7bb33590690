// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document library seam — the operations the dispatcher needs from a PDF
// toolkit: counting pages and assembling new documents from page picks.

use std::sync::Arc;

use blattwerk_core::error::BlattwerkError;
use tracing::{debug, instrument};

use super::reader::PdfReader;
use super::writer::PdfAssembler;

/// Which pages to take from a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pages {
    All,
    /// 1-indexed page numbers, copied in this order.
    Only(Vec<u32>),
}

/// One input to an assembly: decrypted bytes plus the pages to copy.
///
/// The bytes are shared, so several sources cut from one document hold a
/// single copy.
#[derive(Debug, Clone)]
pub struct PageSource {
    pub document: Arc<[u8]>,
    pub pages: Pages,
}

impl PageSource {
    pub fn all(document: impl Into<Arc<[u8]>>) -> Self {
        Self {
            document: document.into(),
            pages: Pages::All,
        }
    }

    pub fn only(document: impl Into<Arc<[u8]>>, pages: Vec<u32>) -> Self {
        Self {
            document: document.into(),
            pages: Pages::Only(pages),
        }
    }
}

/// PDF toolkit operations used by the dispatcher.
///
/// Inputs must already be decrypted; implementations never see passwords.
pub trait DocumentLibrary: Send + Sync {
    /// Number of pages in `document`.
    fn page_count(&self, document: &[u8]) -> Result<u32, BlattwerkError>;

    /// Build one PDF from the given sources, in order.
    fn assemble(&self, sources: &[PageSource]) -> Result<Vec<u8>, BlattwerkError>;
}

/// [`DocumentLibrary`] backed by lopdf.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfLibrary;

impl DocumentLibrary for LopdfLibrary {
    fn page_count(&self, document: &[u8]) -> Result<u32, BlattwerkError> {
        Ok(PdfReader::from_bytes(document)?.page_count())
    }

    #[instrument(skip_all, fields(sources = sources.len()))]
    fn assemble(&self, sources: &[PageSource]) -> Result<Vec<u8>, BlattwerkError> {
        let mut assembler = PdfAssembler::new();
        for source in sources {
            let reader = PdfReader::from_bytes(&source.document)?;
            if reader.is_encrypted() {
                return Err(BlattwerkError::PasswordProtected(
                    "document must be decrypted before assembly".to_string(),
                ));
            }
            let pages = match &source.pages {
                Pages::All => reader.page_numbers(),
                Pages::Only(pages) => pages.clone(),
            };
            assembler.append_pages(&reader, &pages)?;
        }
        debug!(pages = assembler.page_count(), "Assembling document");
        assembler.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{page_widths, sample_pdf};

    #[test]
    fn counts_pages() {
        let library = LopdfLibrary;
        assert_eq!(library.page_count(&sample_pdf(&[1, 2, 3, 4])).unwrap(), 4);
    }

    #[test]
    fn assembles_whole_documents_in_order() {
        let library = LopdfLibrary;
        let output = library
            .assemble(&[
                PageSource::all(sample_pdf(&[101, 102])),
                PageSource::all(sample_pdf(&[201, 202, 203])),
            ])
            .expect("assemble");
        assert_eq!(page_widths(&output), vec![101, 102, 201, 202, 203]);
    }

    #[test]
    fn assembles_a_subset() {
        let library = LopdfLibrary;
        let output = library
            .assemble(&[PageSource::only(sample_pdf(&[101, 102, 103]), vec![1, 3])])
            .expect("assemble");
        assert_eq!(page_widths(&output), vec![101, 103]);
    }

    #[test]
    fn sources_from_one_document_share_its_bytes() {
        let document: Arc<[u8]> = Arc::from(sample_pdf(&[101, 102, 103]));
        let first = PageSource::only(Arc::clone(&document), vec![1]);
        let second = PageSource::only(Arc::clone(&document), vec![2, 3]);
        assert!(Arc::ptr_eq(&first.document, &second.document));

        let output = LopdfLibrary.assemble(&[second, first]).expect("assemble");
        assert_eq!(page_widths(&output), vec![102, 103, 101]);
    }

    #[test]
    fn out_of_range_page_fails() {
        let library = LopdfLibrary;
        let result = library.assemble(&[PageSource::only(sample_pdf(&[101]), vec![2])]);
        assert!(matches!(result, Err(BlattwerkError::PdfError(_))));
    }
}
