// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-engine — Runs Blattwerk jobs.
//
// The dispatcher sequences each operation (decrypt, transform, package)
// against the document collaborators; the worker feeds it one job at a time
// and guarantees every accepted job ends with exactly one terminal event.
// The registry is the requester-side view built from those events.

pub mod dispatcher;
pub mod progress;
pub mod registry;
pub mod worker;

pub use dispatcher::{Dispatcher, JobOutput};
pub use progress::{Phase, ProgressReporter};
pub use registry::JobRegistry;
pub use worker::{EngineHandle, Submission, spawn};

#[cfg(test)]
pub(crate) mod fixtures;
