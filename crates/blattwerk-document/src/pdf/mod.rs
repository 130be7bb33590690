// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading existing documents and assembling new ones from
// selected pages.

pub mod library;
pub mod reader;
pub mod writer;

pub use library::{DocumentLibrary, LopdfLibrary, PageSource, Pages};
pub use reader::PdfReader;
pub use writer::PdfAssembler;
