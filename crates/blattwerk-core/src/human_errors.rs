// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error is mapped to plain English with a clear suggestion,
// so a requester can show something better than a library diagnostic.

use crate::error::{BlattwerkError, ErrorKind};

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether resubmitting with different input can succeed.
    pub fixable_by_user: bool,
    /// Failure class, copied from the underlying error.
    pub kind: ErrorKind,
}

/// Convert a `BlattwerkError` into a `HumanError`.
pub fn humanize_error(err: &BlattwerkError) -> HumanError {
    let kind = err.kind();
    let (message, suggestion, fixable_by_user) = match err {
        BlattwerkError::Validation(detail) => (
            "This request can't be processed as entered.".to_string(),
            format!("Check the files and options you chose, then try again. ({detail})"),
            true,
        ),

        BlattwerkError::Protocol(_) => (
            "The request wasn't understood.".to_string(),
            "This usually means the requesting program and the engine are out of date with each other. Update both and try again.".to_string(),
            false,
        ),

        BlattwerkError::PasswordProtected(_) => (
            "This document is locked with a password.".to_string(),
            "Enter the document's password and try again. If you already entered one, check it for typos.".to_string(),
            true,
        ),

        BlattwerkError::Rewrite(detail) | BlattwerkError::PdfError(detail) => (
            "There's a problem with this PDF file.".to_string(),
            format!("The file may be damaged or use features we can't read. Try re-saving it from another program. ({detail})"),
            false,
        ),

        BlattwerkError::Render(detail) => (
            "A page couldn't be turned into an image.".to_string(),
            format!("Try a lower resolution, or check that the file opens in a PDF viewer. ({detail})"),
            true,
        ),

        BlattwerkError::RenderUnavailable => (
            "Converting pages to images isn't available.".to_string(),
            "This copy was built without the page renderer. Install a build with PDFium support.".to_string(),
            false,
        ),

        BlattwerkError::ImageError(_) => (
            "The page images couldn't be saved.".to_string(),
            "Try the other image format.".to_string(),
            true,
        ),

        BlattwerkError::Archive(detail) => (
            "The output files couldn't be bundled together.".to_string(),
            format!("Try selecting fewer pages or ranges. ({detail})"),
            true,
        ),

        BlattwerkError::Internal(_) => (
            "Something went wrong inside the engine.".to_string(),
            "Try again. If it keeps happening, run with --verbose and report the log.".to_string(),
            false,
        ),

        BlattwerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => (
                "A file couldn't be found.".to_string(),
                "Check the file name and folder, then try again.".to_string(),
                true,
            ),
            std::io::ErrorKind::PermissionDenied => (
                "A file couldn't be opened.".to_string(),
                "Check that you have permission to read the input and write to the output folder.".to_string(),
                true,
            ),
            _ => (
                "Reading or writing a file failed.".to_string(),
                "Check there's enough disk space and try again.".to_string(),
                false,
            ),
        },

        BlattwerkError::Serialization(_) => (
            "The request wasn't understood.".to_string(),
            "The request data is malformed.".to_string(),
            false,
        ),
    };

    HumanError {
        message,
        suggestion,
        fixable_by_user,
        kind,
    }
}
