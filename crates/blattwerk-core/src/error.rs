// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Blattwerk.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all Blattwerk operations.
#[derive(Debug, Error)]
pub enum BlattwerkError {
    // -- Request errors --
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("unrecognised request: {0}")]
    Protocol(String),

    // -- Document errors --
    #[error("document is password-protected or the password is wrong: {0}")]
    PasswordProtected(String),

    #[error("rewrite engine failed: {0}")]
    Rewrite(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("page rendering failed: {0}")]
    Render(String),

    #[error("page rendering is not available in this build")]
    RenderUnavailable,

    #[error("image encoding failed: {0}")]
    ImageError(String),

    #[error("archive encoding failed: {0}")]
    Archive(String),

    #[error("internal error: {0}")]
    Internal(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse failure classes reported to requesters alongside the message.
///
/// None of them is retried by the engine; the requester decides whether to
/// resubmit a corrected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input: empty selection, too few documents, out-of-range options.
    Validation,
    /// Missing or wrong password; resubmit with credentials.
    ProtectedContent,
    /// A collaborator (rewrite, document, render) failed or produced nothing.
    EngineFailure,
    /// The request itself could not be understood.
    Protocol,
}

impl BlattwerkError {
    /// Classify this error for the terminal `error` event.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Protocol(_) | Self::Serialization(_) => ErrorKind::Protocol,
            Self::PasswordProtected(_) => ErrorKind::ProtectedContent,
            Self::Rewrite(_)
            | Self::PdfError(_)
            | Self::Render(_)
            | Self::RenderUnavailable
            | Self::ImageError(_)
            | Self::Archive(_)
            | Self::Internal(_)
            | Self::Io(_) => ErrorKind::EngineFailure,
        }
    }

    /// Rebuild an error from a terminal `error` event's kind and message.
    pub fn from_reported(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::ProtectedContent => Self::PasswordProtected(message),
            ErrorKind::Protocol => Self::Protocol(message),
            ErrorKind::EngineFailure => Self::Internal(message),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlattwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_errors_are_protected_content() {
        let err = BlattwerkError::PasswordProtected("invalid password".into());
        assert_eq!(err.kind(), ErrorKind::ProtectedContent);
    }

    #[test]
    fn collaborator_errors_are_engine_failures() {
        assert_eq!(
            BlattwerkError::Rewrite("no output".into()).kind(),
            ErrorKind::EngineFailure
        );
        assert_eq!(BlattwerkError::RenderUnavailable.kind(), ErrorKind::EngineFailure);
    }

    #[test]
    fn reported_errors_keep_their_kind() {
        for kind in [
            ErrorKind::Validation,
            ErrorKind::ProtectedContent,
            ErrorKind::EngineFailure,
            ErrorKind::Protocol,
        ] {
            assert_eq!(BlattwerkError::from_reported(kind, "x".into()).kind(), kind);
        }
    }

    #[test]
    fn bad_json_is_a_protocol_error() {
        let err: BlattwerkError = serde_json::from_str::<u32>("{").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
