// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Blattwerk job engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::protocol::EngineEvent;

/// MIME type of every PDF output.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";
/// MIME type of every multi-file output.
pub const ARCHIVE_MEDIA_TYPE: &str = "application/zip";

/// Unique identifier for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Placeholder used when a rejected request carries no usable id.
    pub const UNKNOWN: JobId = JobId(Uuid::nil());

    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn is_unknown(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four supported transformations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Combine,
    Extract,
    Shrink,
    Rasterize,
}

impl OperationKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Combine => "combine",
            Self::Extract => "extract",
            Self::Shrink => "shrink",
            Self::Rasterize => "rasterize",
        }
    }
}

/// Lifecycle states of a job. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created by the requester, no event seen yet.
    Queued,
    /// At least one progress event received.
    Running,
    /// Finished with a result.
    Done,
    /// Finished with an error.
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// Output layout for an extract job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMode {
    /// One document holding every selected page, ascending.
    #[default]
    Single,
    /// One document per page group, bundled in an archive.
    Archive,
}

/// Requested compression effort for a shrink job.
///
/// All tiers currently map to the same conservative rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionTier {
    #[serde(rename = "tier1")]
    Light,
    #[default]
    #[serde(rename = "tier2")]
    Balanced,
    #[serde(rename = "tier3")]
    Strong,
}

impl CompressionTier {
    /// Map the CLI's `1|2|3` onto a tier.
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Light),
            2 => Some(Self::Balanced),
            3 => Some(Self::Strong),
            _ => None,
        }
    }
}

/// Image formats a rasterize job can produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    #[default]
    Png,
    Jpeg,
}

impl RasterFormat {
    /// File extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// Short name used in output file names.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }
}

/// Requester-side record of one job.
///
/// The engine never holds these; they are rebuilt from the event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: OperationKind,
    pub status: JobStatus,
    /// Last reported percentage, never decreasing.
    pub progress: u8,
    /// Latest progress note, if any.
    pub note: Option<String>,
    pub output_name: Option<String>,
    pub output: Option<Vec<u8>>,
    pub media_type: Option<String>,
    pub error_message: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(kind: OperationKind) -> Self {
        Self::with_id(JobId::new(), kind)
    }

    pub fn with_id(id: JobId, kind: OperationKind) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            status: JobStatus::Queued,
            progress: 0,
            note: None,
            output_name: None,
            output: None,
            media_type: None,
            error_message: None,
            error_kind: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fold one engine event into this job.
    ///
    /// Returns `false` when the event was ignored: it belongs to another job
    /// or the job has already finished.
    pub fn apply(&mut self, event: &EngineEvent) -> bool {
        if event.job_id() != self.id || self.status.is_terminal() {
            return false;
        }

        match event {
            EngineEvent::Progress { percent, note, .. } => {
                self.status = JobStatus::Running;
                self.progress = self.progress.max((*percent).min(100));
                if note.is_some() {
                    self.note = note.clone();
                }
            }
            EngineEvent::Result {
                output_name,
                payload,
                media_type,
                ..
            } => {
                self.status = JobStatus::Done;
                self.progress = 100;
                self.output_name = Some(output_name.clone());
                self.output = Some(payload.clone());
                self.media_type = Some(media_type.clone());
            }
            EngineEvent::Error { kind, message, .. } => {
                self.status = JobStatus::Error;
                self.error_message = Some(message.clone());
                self.error_kind = Some(*kind);
            }
        }

        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(id: JobId, percent: u8) -> EngineEvent {
        EngineEvent::Progress {
            job_id: id,
            percent,
            note: None,
        }
    }

    #[test]
    fn lifecycle_moves_forward() {
        let mut job = Job::new(OperationKind::Shrink);
        assert_eq!(job.status, JobStatus::Queued);

        assert!(job.apply(&progress(job.id, 10)));
        assert_eq!(job.status, JobStatus::Running);

        let done = EngineEvent::Result {
            job_id: job.id,
            output_name: "out.pdf".into(),
            payload: vec![1, 2, 3],
            media_type: PDF_MEDIA_TYPE.into(),
        };
        assert!(job.apply(&done));
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.progress, 100);
        assert_eq!(job.output.as_deref(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn finished_job_is_immutable() {
        let mut job = Job::new(OperationKind::Combine);
        let failed = EngineEvent::Error {
            job_id: job.id,
            kind: ErrorKind::Validation,
            message: "need two documents".into(),
        };
        assert!(job.apply(&failed));
        assert!(!job.apply(&progress(job.id, 50)));
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.progress, 0);
    }

    #[test]
    fn progress_never_decreases() {
        let mut job = Job::new(OperationKind::Rasterize);
        job.apply(&progress(job.id, 40));
        job.apply(&progress(job.id, 20));
        assert_eq!(job.progress, 40);
    }

    #[test]
    fn events_for_other_jobs_are_ignored() {
        let mut job = Job::new(OperationKind::Extract);
        assert!(!job.apply(&progress(JobId::new(), 10)));
        assert_eq!(job.status, JobStatus::Queued);
    }

    #[test]
    fn unknown_id_is_nil() {
        assert!(JobId::UNKNOWN.is_unknown());
        assert!(!JobId::new().is_unknown());
    }

    #[test]
    fn tiers_use_wire_names() {
        let json = serde_json::to_string(&CompressionTier::Strong).expect("serialize");
        assert_eq!(json, "\"tier3\"");
        assert_eq!(CompressionTier::from_level(1), Some(CompressionTier::Light));
        assert_eq!(CompressionTier::from_level(4), None);
    }
}
