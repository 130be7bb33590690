// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job protocol — the messages exchanged between a requester and the engine.
//
// Requests are tagged by `op`, events by `type`; both use camelCase field
// names on the wire. Every accepted job ends with exactly one `result` or
// `error` event, preceded by any number of `progress` events.

use serde::{Deserialize, Serialize};

use crate::error::{BlattwerkError, ErrorKind};
use crate::types::{CompressionTier, ExtractMode, JobId, OperationKind, RasterFormat};

/// One input file: its bytes, display name, and optional password.
#[derive(Clone, Serialize, Deserialize)]
pub struct InputDocument {
    pub name: String,
    pub bytes: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl InputDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

// Hand-written so passwords and payloads never end up in logs.
impl std::fmt::Debug for InputDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputDocument")
            .field("name", &self.name)
            .field("bytes_len", &self.bytes.len())
            .field("has_password", &self.password.is_some())
            .finish()
    }
}

/// A unit of work submitted to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum JobRequest {
    Combine {
        job_id: JobId,
        documents: Vec<InputDocument>,
    },
    Extract {
        job_id: JobId,
        document: InputDocument,
        #[serde(default)]
        pages: Vec<i64>,
        #[serde(default)]
        groups: Vec<Vec<i64>>,
        #[serde(default)]
        mode: ExtractMode,
    },
    Shrink {
        job_id: JobId,
        document: InputDocument,
        #[serde(default)]
        tier: CompressionTier,
    },
    Rasterize {
        job_id: JobId,
        document: InputDocument,
        #[serde(default)]
        format: RasterFormat,
        dpi: u32,
    },
}

impl JobRequest {
    pub fn job_id(&self) -> JobId {
        match self {
            Self::Combine { job_id, .. }
            | Self::Extract { job_id, .. }
            | Self::Shrink { job_id, .. }
            | Self::Rasterize { job_id, .. } => *job_id,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Combine { .. } => OperationKind::Combine,
            Self::Extract { .. } => OperationKind::Extract,
            Self::Shrink { .. } => OperationKind::Shrink,
            Self::Rasterize { .. } => OperationKind::Rasterize,
        }
    }
}

/// Everything the engine emits for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EngineEvent {
    Progress {
        job_id: JobId,
        percent: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    Result {
        job_id: JobId,
        output_name: String,
        payload: Vec<u8>,
        media_type: String,
    },
    Error {
        job_id: JobId,
        kind: ErrorKind,
        message: String,
    },
}

impl EngineEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            Self::Progress { job_id, .. }
            | Self::Result { job_id, .. }
            | Self::Error { job_id, .. } => *job_id,
        }
    }

    /// Whether this event ends its job.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }

    /// Terminal error event for `err`.
    pub fn from_error(job_id: JobId, err: &BlattwerkError) -> Self {
        Self::Error {
            job_id,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// A request payload that could not be decoded.
#[derive(Debug)]
pub struct RejectedRequest {
    /// The `jobId` recovered from the payload, or [`JobId::UNKNOWN`].
    pub job_id: JobId,
    pub error: BlattwerkError,
}

/// Decode a raw JSON request.
///
/// On failure, the job id is salvaged from the payload when it is present
/// and well-formed so the requester can still correlate the error.
pub fn decode_request(raw: &[u8]) -> Result<JobRequest, RejectedRequest> {
    let value: serde_json::Value = serde_json::from_slice(raw).map_err(|err| RejectedRequest {
        job_id: JobId::UNKNOWN,
        error: BlattwerkError::Protocol(format!("payload is not JSON: {err}")),
    })?;

    let job_id = value
        .get("jobId")
        .cloned()
        .and_then(|id| serde_json::from_value::<JobId>(id).ok())
        .unwrap_or(JobId::UNKNOWN);

    serde_json::from_value::<JobRequest>(value).map_err(|err| RejectedRequest {
        job_id,
        error: BlattwerkError::Protocol(format!("unsupported request shape: {err}")),
    })
}
