// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments and their translation into job requests.

use std::path::{Path, PathBuf};

use blattwerk_core::config::EngineConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::pages::parse_groups;
use blattwerk_core::protocol::{InputDocument, JobRequest};
use blattwerk_core::types::{CompressionTier, ExtractMode, JobId, RasterFormat};
use clap::{Parser, Subcommand, ValueEnum};

/// Blattwerk - combine, extract, shrink, and rasterize PDFs without them
/// leaving this machine.
#[derive(Parser, Debug)]
#[command(name = "blattwerk", version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/blattwerk/config.json)
    #[arg(long, global = true, env = "BLATTWERK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory to write results into
    #[arg(short, long = "output-dir", global = true, default_value = ".")]
    pub output_dir: PathBuf,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Join documents, in the order given, into one
    Combine {
        /// Two or more PDF files
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,
        /// Password applied to every input
        #[arg(long)]
        password: Option<String>,
    },

    /// Copy selected pages into a new document, or one document per range
    Extract {
        file: PathBuf,
        /// Page ranges, e.g. "1-3,7"; separate groups with ';'
        #[arg(short, long)]
        pages: String,
        /// Write one document per group, bundled in a ZIP
        #[arg(long)]
        archive: bool,
        #[arg(long)]
        password: Option<String>,
    },

    /// Rewrite a document with recompressed streams
    Shrink {
        file: PathBuf,
        /// Compression tier
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=3))]
        tier: u8,
        #[arg(long)]
        password: Option<String>,
    },

    /// Render every page to an image, bundled in a ZIP
    Rasterize {
        file: PathBuf,
        #[arg(long, value_enum, default_value = "png")]
        format: CliRasterFormat,
        /// Resolution (defaults to the configured default_dpi)
        #[arg(long)]
        dpi: Option<u32>,
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CliRasterFormat {
    Png,
    Jpeg,
}

impl From<CliRasterFormat> for RasterFormat {
    fn from(format: CliRasterFormat) -> Self {
        match format {
            CliRasterFormat::Png => RasterFormat::Png,
            CliRasterFormat::Jpeg => RasterFormat::Jpeg,
        }
    }
}

impl Command {
    /// Read the input files and build the request for this command.
    pub fn to_request(&self, config: &EngineConfig) -> Result<JobRequest> {
        let job_id = JobId::new();
        Ok(match self {
            Self::Combine { files, password } => JobRequest::Combine {
                job_id,
                documents: files
                    .iter()
                    .map(|file| read_document(file, password.as_deref()))
                    .collect::<Result<Vec<_>>>()?,
            },
            Self::Extract {
                file,
                pages,
                archive,
                password,
            } => {
                let selection = parse_groups(pages);
                if selection.is_empty() {
                    return Err(BlattwerkError::Validation(format!(
                        "no page numbers found in {pages:?}"
                    )));
                }
                JobRequest::Extract {
                    job_id,
                    document: read_document(file, password.as_deref())?,
                    pages: selection.pages.iter().map(|&p| i64::from(p)).collect(),
                    groups: selection
                        .groups
                        .iter()
                        .map(|group| group.iter().map(|&p| i64::from(p)).collect())
                        .collect(),
                    mode: if *archive {
                        ExtractMode::Archive
                    } else {
                        ExtractMode::Single
                    },
                }
            }
            Self::Shrink {
                file,
                tier,
                password,
            } => JobRequest::Shrink {
                job_id,
                document: read_document(file, password.as_deref())?,
                tier: CompressionTier::from_level(*tier).unwrap_or_default(),
            },
            Self::Rasterize {
                file,
                format,
                dpi,
                password,
            } => JobRequest::Rasterize {
                job_id,
                document: read_document(file, password.as_deref())?,
                format: (*format).into(),
                dpi: dpi.unwrap_or(config.default_dpi),
            },
        })
    }
}

fn read_document(path: &Path, password: Option<&str>) -> Result<InputDocument> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());
    let document = InputDocument::new(name, bytes);
    Ok(match password {
        Some(password) => document.with_password(password),
        None => document,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments parse")
    }

    #[test]
    fn combine_needs_two_files() {
        assert!(Cli::try_parse_from(["blattwerk", "combine", "a.pdf"]).is_err());
        let cli = parse(&["blattwerk", "combine", "a.pdf", "b.pdf", "-o", "out"]);
        assert_eq!(cli.output_dir, PathBuf::from("out"));
        assert!(matches!(cli.command, Command::Combine { ref files, .. } if files.len() == 2));
    }

    #[test]
    fn shrink_tier_is_bounded() {
        assert!(Cli::try_parse_from(["blattwerk", "shrink", "a.pdf", "--tier", "4"]).is_err());
        let cli = parse(&["blattwerk", "shrink", "a.pdf", "--tier", "3"]);
        assert!(matches!(cli.command, Command::Shrink { tier: 3, .. }));
    }

    #[test]
    fn extract_builds_groups_from_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("report.pdf");
        std::fs::write(&file, b"%PDF-1.7").expect("write");

        let command = Command::Extract {
            file,
            pages: "1; 3-4".to_string(),
            archive: true,
            password: Some("pw".to_string()),
        };
        match command.to_request(&EngineConfig::default()).expect("request") {
            JobRequest::Extract {
                document,
                pages,
                groups,
                mode,
                ..
            } => {
                assert_eq!(document.name, "report.pdf");
                assert_eq!(document.password.as_deref(), Some("pw"));
                assert_eq!(pages, vec![1, 3, 4]);
                assert_eq!(groups, vec![vec![1], vec![3, 4]]);
                assert_eq!(mode, ExtractMode::Archive);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn empty_page_text_is_rejected_before_reading() {
        let command = Command::Extract {
            file: PathBuf::from("does-not-exist.pdf"),
            pages: "abc, ,".to_string(),
            archive: false,
            password: None,
        };
        let err = command
            .to_request(&EngineConfig::default())
            .expect_err("empty selection");
        assert!(matches!(err, BlattwerkError::Validation(_)));
    }

    #[test]
    fn rasterize_defaults_to_configured_dpi() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("a.pdf");
        std::fs::write(&file, b"%PDF-1.7").expect("write");
        let config = EngineConfig {
            default_dpi: 200,
            ..Default::default()
        };

        let cli = parse(&[
            "blattwerk",
            "rasterize",
            file.to_str().expect("utf-8 path"),
            "--format",
            "jpeg",
        ]);
        match cli.command.to_request(&config).expect("request") {
            JobRequest::Rasterize { format, dpi, .. } => {
                assert_eq!(format, RasterFormat::Jpeg);
                assert_eq!(dpi, 200);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let command = Command::Shrink {
            file: PathBuf::from("/nonexistent/blattwerk/input.pdf"),
            tier: 1,
            password: None,
        };
        assert!(matches!(
            command.to_request(&EngineConfig::default()),
            Err(BlattwerkError::Io(_))
        ));
    }
}
