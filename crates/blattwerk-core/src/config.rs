// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{BlattwerkError, Result};

/// Settings shared by the engine and its requesters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Resolution used when a rasterize request does not name one.
    pub default_dpi: u32,
    /// Lowest accepted rasterize resolution.
    pub min_dpi: u32,
    /// Highest accepted rasterize resolution.
    pub max_dpi: u32,
    /// JPEG encoder quality (1-100).
    pub jpeg_quality: u8,
    /// Parent directory for the rewrite engine's scratch storage.
    /// The system temp directory is used when unset.
    pub work_dir: Option<PathBuf>,
    /// Directory containing the PDFium shared library (`pdfium` feature only).
    pub pdfium_library_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_dpi: 150,
            min_dpi: 36,
            max_dpi: 600,
            jpeg_quality: 85,
            work_dir: None,
            pdfium_library_path: None,
        }
    }
}

impl EngineConfig {
    /// Reject settings the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.min_dpi == 0 || self.min_dpi > self.max_dpi {
            return Err(BlattwerkError::Validation(format!(
                "dpi bounds {}..={} are not a valid range",
                self.min_dpi, self.max_dpi
            )));
        }
        if !(self.min_dpi..=self.max_dpi).contains(&self.default_dpi) {
            return Err(BlattwerkError::Validation(format!(
                "default dpi {} lies outside {}..={}",
                self.default_dpi, self.min_dpi, self.max_dpi
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(BlattwerkError::Validation(format!(
                "jpeg quality {} must be between 1 and 100",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    /// Whether `dpi` is inside the accepted rasterize range.
    pub fn accepts_dpi(&self, dpi: u32) -> bool {
        (self.min_dpi..=self.max_dpi).contains(&dpi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().expect("defaults validate");
    }

    #[test]
    fn inverted_dpi_bounds_are_rejected() {
        let config = EngineConfig {
            min_dpi: 300,
            max_dpi: 72,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "jpeg_quality": 60 }"#).expect("parse");
        assert_eq!(config.jpeg_quality, 60);
        assert_eq!(config.default_dpi, 150);
        assert!(config.accepts_dpi(600));
        assert!(!config.accepts_dpi(601));
    }
}
