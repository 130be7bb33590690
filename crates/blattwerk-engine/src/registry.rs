// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Requester-side job registry.
//
// Tracks the jobs a requester has submitted and folds engine events into
// them. The engine never reads it.

use std::collections::HashMap;

use blattwerk_core::protocol::{EngineEvent, JobRequest};
use blattwerk_core::types::{Job, JobId};
use tracing::debug;

/// In-memory jobs, listed in submission order.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: HashMap<JobId, Job>,
    order: Vec<JobId>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `request` as a queued job. Re-tracking an id resets it.
    pub fn track(&mut self, request: &JobRequest) -> JobId {
        let id = request.job_id();
        if self
            .jobs
            .insert(id, Job::with_id(id, request.kind()))
            .is_none()
        {
            self.order.push(id);
        }
        id
    }

    /// Route `event` to its job. Returns `false` for unknown or finished jobs.
    pub fn apply(&mut self, event: &EngineEvent) -> bool {
        match self.jobs.get_mut(&event.job_id()) {
            Some(job) => job.apply(event),
            None => {
                debug!(job_id = %event.job_id(), "Event for untracked job");
                false
            }
        }
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    /// All jobs, oldest first.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.order.iter().filter_map(|id| self.jobs.get(id))
    }

    /// Jobs that have not reached `done` or `error`.
    pub fn pending(&self) -> usize {
        self.jobs
            .values()
            .filter(|job| !job.status.is_terminal())
            .count()
    }

    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        self.order.retain(|tracked| *tracked != id);
        self.jobs.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_core::error::ErrorKind;
    use blattwerk_core::protocol::InputDocument;
    use blattwerk_core::types::{CompressionTier, JobStatus, OperationKind};

    fn shrink(job_id: JobId) -> JobRequest {
        JobRequest::Shrink {
            job_id,
            document: InputDocument::new("a.pdf", b"%PDF".to_vec()),
            tier: CompressionTier::Light,
        }
    }

    #[test]
    fn tracks_jobs_in_submission_order() {
        let mut registry = JobRegistry::new();
        let a = registry.track(&shrink(JobId::new()));
        let b = registry.track(&shrink(JobId::new()));
        let ids: Vec<JobId> = registry.jobs().map(|job| job.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(registry.pending(), 2);
        assert_eq!(registry.get(a).map(|job| job.kind), Some(OperationKind::Shrink));
    }

    #[test]
    fn events_drive_the_lifecycle() {
        let mut registry = JobRegistry::new();
        let id = registry.track(&shrink(JobId::new()));

        assert!(registry.apply(&EngineEvent::Progress {
            job_id: id,
            percent: 40,
            note: None,
        }));
        assert_eq!(registry.get(id).map(|job| job.status), Some(JobStatus::Running));

        assert!(registry.apply(&EngineEvent::Error {
            job_id: id,
            kind: ErrorKind::ProtectedContent,
            message: "password required".into(),
        }));
        assert_eq!(registry.pending(), 0);

        // Finished jobs ignore anything further.
        assert!(!registry.apply(&EngineEvent::Progress {
            job_id: id,
            percent: 90,
            note: None,
        }));
    }

    #[test]
    fn events_for_unknown_jobs_are_ignored() {
        let mut registry = JobRegistry::new();
        assert!(!registry.apply(&EngineEvent::Error {
            job_id: JobId::UNKNOWN,
            kind: ErrorKind::Protocol,
            message: "bad request".into(),
        }));
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_forgets_the_job() {
        let mut registry = JobRegistry::new();
        let id = registry.track(&shrink(JobId::new()));
        assert!(registry.remove(id).is_some());
        assert_eq!(registry.jobs().count(), 0);
        assert_eq!(registry.len(), 0);
    }
}
