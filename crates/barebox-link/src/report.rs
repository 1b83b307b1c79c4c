// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job status reports.

use std::time::Duration;

use reqwest::header::COOKIE;
use tracing::{info, instrument};

use barebox_core::error::{BareboxError, Result};
use barebox_core::{AgentConfig, JobId, JobOutcome, Session};

/// Header the service reads the anti-forgery token from.
const CSRF_HEADER: &str = "X-CSRFToken";

const REPORT_TIMEOUT_SECS: u64 = 30;

/// PATCHes job outcomes to `{status_url}{job_id}/`.
pub struct StatusReporter {
    client: reqwest::Client,
    status_url: String,
}

impl StatusReporter {
    pub fn new(status_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REPORT_TIMEOUT_SECS))
            .build()
            .map_err(|e| BareboxError::Transport(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            status_url: status_url.into(),
        })
    }

    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        Self::new(config.status_url.clone())
    }

    pub fn job_url(&self, job_id: &JobId) -> String {
        format!("{}{}/", self.status_url, job_id)
    }

    /// Send one outcome.  Any non-2xx answer is a `Report` error.
    #[instrument(skip_all, fields(job_id = %outcome.job_id, status = %outcome.status))]
    pub async fn report(&self, session: &Session, outcome: &JobOutcome) -> Result<()> {
        let url = self.job_url(&outcome.job_id);
        info!("updating printing status");

        let response = self
            .client
            .patch(&url)
            .header(CSRF_HEADER, session.csrf_token())
            .header(COOKIE, session.api_cookie())
            .form(&outcome.form_fields())
            .send()
            .await
            .map_err(|e| BareboxError::Report(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BareboxError::Report(format!("{url} answered {status}")));
        }
        Ok(())
    }
}
