// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Progress reporting for a single job.

use blattwerk_core::protocol::EngineEvent;
use blattwerk_core::types::JobId;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// A slice of the 0-100 range owned by one stage of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    pub start: u8,
    pub end: u8,
}

impl Phase {
    pub const fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    /// Percent after `done` of `total` units of this phase.
    pub fn at(&self, done: usize, total: usize) -> u8 {
        if total == 0 || self.end <= self.start {
            return self.end.max(self.start);
        }
        let span = usize::from(self.end - self.start);
        let offset = span * done.min(total) / total;
        self.start + offset as u8
    }
}

/// Emits `progress` events for one job, never letting the percent go down.
pub struct ProgressReporter {
    job_id: JobId,
    tx: UnboundedSender<EngineEvent>,
    last: Option<u8>,
}

impl ProgressReporter {
    pub fn new(job_id: JobId, tx: UnboundedSender<EngineEvent>) -> Self {
        Self {
            job_id,
            tx,
            last: None,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Highest percent reported so far.
    pub fn percent(&self) -> u8 {
        self.last.unwrap_or(0)
    }

    /// Report `percent` (clamped to 100 and to the last reported value).
    pub fn report(&mut self, percent: u8, note: impl Into<String>) {
        let percent = percent.min(100).max(self.percent());
        self.last = Some(percent);
        self.send(EngineEvent::Progress {
            job_id: self.job_id,
            percent,
            note: Some(note.into()),
        });
    }

    /// Report unit `done` of `total` inside `phase`.
    pub fn step(&mut self, phase: Phase, done: usize, total: usize, note: impl Into<String>) {
        self.report(phase.at(done, total), note);
    }

    /// Emit the job's terminal event, consuming the reporter.
    pub(crate) fn finish(self, event: EngineEvent) {
        debug_assert!(event.is_terminal());
        self.send(event);
    }

    fn send(&self, event: EngineEvent) {
        // A dropped receiver means the requester discarded the job.
        if self.tx.send(event).is_err() {
            debug!(job_id = %self.job_id, "Event receiver gone, dropping event");
        }
    }
}
