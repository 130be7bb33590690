// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job worker: a single task that takes submissions off a channel and runs
// them one at a time.
//
// Every accepted job ends with exactly one `result` or `error` event, even if
// the dispatcher panics. Undecodable raw submissions produce a single
// `error` event for whatever job id could be salvaged.

use std::sync::Arc;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::protocol::{EngineEvent, JobRequest, decode_request};
use blattwerk_core::types::JobId;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, instrument, warn};

use crate::dispatcher::Dispatcher;
use crate::progress::ProgressReporter;

/// What a requester hands the worker.
#[derive(Debug)]
pub enum Submission {
    /// An already-typed request.
    Request(JobRequest),
    /// A JSON payload to decode first.
    Raw(Vec<u8>),
}

/// Cloneable submitter. The worker stops once every handle is dropped and
/// the queue is drained; the event stream closes after that.
#[derive(Clone)]
pub struct EngineHandle {
    tx: UnboundedSender<Submission>,
}

impl EngineHandle {
    /// Queue `request`, returning its job id.
    pub fn submit(&self, request: JobRequest) -> Result<JobId> {
        let job_id = request.job_id();
        self.send(Submission::Request(request))?;
        Ok(job_id)
    }

    /// Queue a JSON request payload.
    pub fn submit_raw(&self, raw: impl Into<Vec<u8>>) -> Result<()> {
        self.send(Submission::Raw(raw.into()))
    }

    fn send(&self, submission: Submission) -> Result<()> {
        self.tx
            .send(submission)
            .map_err(|_| BlattwerkError::Internal("job worker has stopped".to_string()))
    }
}

/// Start the worker on the current Tokio runtime.
pub fn spawn(dispatcher: Dispatcher) -> (EngineHandle, UnboundedReceiver<EngineEvent>) {
    let (submit_tx, submit_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    tokio::spawn(run(Arc::new(dispatcher), submit_rx, event_tx));
    (EngineHandle { tx: submit_tx }, event_rx)
}

async fn run(
    dispatcher: Arc<Dispatcher>,
    mut submissions: UnboundedReceiver<Submission>,
    events: UnboundedSender<EngineEvent>,
) {
    info!("Job worker started");
    while let Some(submission) = submissions.recv().await {
        let request = match submission {
            Submission::Request(request) => request,
            Submission::Raw(raw) => match decode_request(&raw) {
                Ok(request) => request,
                Err(rejected) => {
                    warn!(job_id = %rejected.job_id, error = %rejected.error, "Request rejected");
                    let _ = events.send(EngineEvent::from_error(rejected.job_id, &rejected.error));
                    continue;
                }
            },
        };
        run_job(&dispatcher, request, &events).await;
    }
    info!("Job worker stopped");
}

#[instrument(skip_all, fields(job_id = %request.job_id(), op = request.kind().label()))]
async fn run_job(
    dispatcher: &Arc<Dispatcher>,
    request: JobRequest,
    events: &UnboundedSender<EngineEvent>,
) {
    let job_id = request.job_id();
    let dispatcher = Arc::clone(dispatcher);
    let mut progress = ProgressReporter::new(job_id, events.clone());

    // Own task, so a panic surfaces as a JoinError instead of killing the loop.
    let job = tokio::spawn(async move {
        let outcome = dispatcher.dispatch(request, &mut progress).await;
        (progress, outcome)
    });

    match job.await {
        Ok((progress, Ok(output))) => progress.finish(EngineEvent::Result {
            job_id,
            output_name: output.name,
            payload: output.payload,
            media_type: output.media_type,
        }),
        Ok((progress, Err(err))) => {
            warn!(kind = ?err.kind(), error = %err, "Job failed");
            progress.finish(EngineEvent::from_error(job_id, &err));
        }
        Err(join_err) => {
            error!(error = %join_err, "Job aborted");
            let err = BlattwerkError::Internal(format!("job aborted: {join_err}"));
            let _ = events.send(EngineEvent::from_error(job_id, &err));
        }
    }
}
