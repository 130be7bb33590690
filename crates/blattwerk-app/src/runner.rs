// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Drives one job through the engine worker and writes its result.

use std::path::{Path, PathBuf};

use blattwerk_core::error::{BlattwerkError, ErrorKind, Result};
use blattwerk_core::protocol::JobRequest;
use blattwerk_core::types::JobStatus;
use blattwerk_engine::{Dispatcher, JobRegistry, spawn};
use tracing::{debug, info};

/// Submit `request`, print progress as it arrives, and write the output into
/// `output_dir`. Returns the written path.
pub async fn run(
    dispatcher: Dispatcher,
    request: JobRequest,
    output_dir: &Path,
) -> Result<PathBuf> {
    let mut registry = JobRegistry::new();
    let job_id = registry.track(&request);

    let (handle, mut events) = spawn(dispatcher);
    handle.submit(request)?;
    drop(handle);

    while let Some(event) = events.recv().await {
        if !registry.apply(&event) {
            debug!(job_id = %event.job_id(), "Ignoring event");
            continue;
        }
        let Some(job) = registry.get(job_id) else {
            continue;
        };
        match job.status {
            JobStatus::Queued | JobStatus::Running => {
                eprintln!(
                    "[{:>3}%] {}",
                    job.progress,
                    job.note.as_deref().unwrap_or_default()
                );
            }
            JobStatus::Done | JobStatus::Error => break,
        }
    }

    let job = registry
        .remove(job_id)
        .ok_or_else(|| BlattwerkError::Internal("job vanished from registry".to_string()))?;
    match job.status {
        JobStatus::Done => {
            let name = job.output_name.unwrap_or_else(|| "output".to_string());
            let payload = job.output.unwrap_or_default();
            std::fs::create_dir_all(output_dir)?;
            let path = output_dir.join(name);
            std::fs::write(&path, &payload)?;
            info!(path = %path.display(), bytes = payload.len(), "Result written");
            Ok(path)
        }
        JobStatus::Error => Err(BlattwerkError::from_reported(
            job.error_kind.unwrap_or(ErrorKind::EngineFailure),
            job.error_message.unwrap_or_default(),
        )),
        JobStatus::Queued | JobStatus::Running => Err(BlattwerkError::Internal(
            "engine stopped before the job finished".to_string(),
        )),
    }
}
