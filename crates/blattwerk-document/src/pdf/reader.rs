// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open and inspect existing (already decrypted) PDF documents
// using the `lopdf` crate.

use std::collections::BTreeMap;

use blattwerk_core::error::BlattwerkError;
use lopdf::{Document, ObjectId};
use tracing::{debug, instrument};

/// Read-only view of a loaded PDF.
///
/// Wraps `lopdf::Document` and resolves 1-indexed page numbers to the page
/// objects the assembler copies from.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Page number (1-indexed) to page object, in document order.
    pages: BTreeMap<u32, ObjectId>,
}

impl PdfReader {
    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, BlattwerkError> {
        let document = Document::load_mem(data).map_err(|err| {
            BlattwerkError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        let pages = document.get_pages();
        debug!(pages = pages.len(), "PDF loaded from bytes");

        Ok(Self { document, pages })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Whether the document still carries an /Encrypt dictionary.
    pub fn is_encrypted(&self) -> bool {
        self.document.is_encrypted()
    }

    /// The page object for a 1-indexed page number.
    pub fn page_id(&self, page_number: u32) -> Result<ObjectId, BlattwerkError> {
        self.pages.get(&page_number).copied().ok_or_else(|| {
            BlattwerkError::PdfError(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                self.pages.len()
            ))
        })
    }

    /// All page numbers, ascending.
    pub fn page_numbers(&self) -> Vec<u32> {
        self.pages.keys().copied().collect()
    }

    /// The underlying lopdf document.
    pub fn document(&self) -> &Document {
        &self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::sample_pdf;

    #[test]
    fn counts_pages() {
        let reader = PdfReader::from_bytes(&sample_pdf(&[101, 102, 103])).expect("load");
        assert_eq!(reader.page_count(), 3);
        assert_eq!(reader.page_numbers(), vec![1, 2, 3]);
        assert!(!reader.is_encrypted());
    }

    #[test]
    fn page_zero_and_past_end_are_rejected() {
        let reader = PdfReader::from_bytes(&sample_pdf(&[101, 102])).expect("load");
        assert!(reader.page_id(0).is_err());
        assert!(reader.page_id(3).is_err());
        assert!(reader.page_id(2).is_ok());
    }

    #[test]
    fn garbage_is_a_pdf_error() {
        match PdfReader::from_bytes(b"definitely not a pdf") {
            Err(BlattwerkError::PdfError(_)) => {}
            Err(other) => panic!("unexpected error variant: {other}"),
            Ok(_) => panic!("garbage must not load"),
        }
    }
}
