// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-message job handling.
//
// Heartbeats are dropped, malformed payloads are logged and skipped, and every
// well-formed job is run through the print pipeline and then reported exactly
// once, whatever the pipeline did.  Nothing here returns an error: a failing
// job must never take the connection down.

use chrono::Utc;
use tracing::{error, info, trace, warn};

use barebox_core::{JobMessage, JobOutcome, PrintStatus, Session};
use barebox_print::PrintPipeline;

use crate::report::StatusReporter;

/// What happened to one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Heartbeat,
    Malformed,
    /// Job ran and its outcome was accepted by the service.
    Reported(PrintStatus),
    /// Job ran but the status report did not go through.
    ReportFailed(PrintStatus),
}

pub struct JobHandler {
    pipeline: PrintPipeline,
    reporter: StatusReporter,
}

impl JobHandler {
    pub fn new(pipeline: PrintPipeline, reporter: StatusReporter) -> Self {
        Self { pipeline, reporter }
    }

    pub async fn handle(&self, session: &Session, text: &str) -> Handled {
        let (job_id, resource_url) = match JobMessage::parse(text) {
            Ok(JobMessage::Heartbeat) => {
                trace!("heartbeat");
                return Handled::Heartbeat;
            }
            Ok(JobMessage::Job {
                job_id,
                resource_url,
            }) => (job_id, resource_url),
            Err(e) => {
                warn!(error = %e, "skipping job message");
                return Handled::Malformed;
            }
        };

        info!(job_id = %job_id, url = %resource_url, "signal for photo printing received");

        let outcome = match self.pipeline.run(&resource_url).await {
            Ok(()) => JobOutcome::succeeded(job_id, Utc::now()),
            Err(e) => {
                error!(job_id = %job_id, error = %e, "error occurred during image printing");
                JobOutcome::failed(job_id, &e, &resource_url)
            }
        };

        let status = outcome.status;
        match self.reporter.report(session, &outcome).await {
            Ok(()) => Handled::Reported(status),
            Err(e) => {
                error!(job_id = %outcome.job_id, error = %e, "printing status not delivered");
                Handled::ReportFailed(status)
            }
        }
    }
}
