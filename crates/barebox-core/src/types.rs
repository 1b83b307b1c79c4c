// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Barebox print agent.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{BareboxError, Result};

/// Text frame the service sends to keep the streaming connection alive.
pub const HEARTBEAT_SENTINEL: &str = "--heartbeat--";

/// Identifier of a photo print job, as assigned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One inbound text frame from the job-notification stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobMessage {
    /// Keep-alive; carries no job.
    Heartbeat,
    /// Print the image at `resource_url` and report back under `job_id`.
    Job { job_id: JobId, resource_url: String },
}

impl JobMessage {
    /// Parse a raw frame.
    ///
    /// Anything other than the heartbeat sentinel must be exactly two
    /// non-empty comma-separated fields: `{job_id},{resource_url}`.
    pub fn parse(text: &str) -> Result<Self> {
        if text == HEARTBEAT_SENTINEL {
            return Ok(Self::Heartbeat);
        }

        let mut fields = text.split(',').map(str::trim);
        match (fields.next(), fields.next(), fields.next()) {
            (Some(id), Some(url), None) if !id.is_empty() && !url.is_empty() => Ok(Self::Job {
                job_id: JobId(id.to_string()),
                resource_url: url.to_string(),
            }),
            _ => Err(BareboxError::MalformedMessage(text.to_string())),
        }
    }
}

/// Final status of a print job as reported to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintStatus {
    Succeeded,
    Failed,
}

impl PrintStatus {
    /// Value of the `print_status` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PrintStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one job, sent to the service exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub status: PrintStatus,
    /// Empty on success.
    pub error: String,
    /// Set only on success.
    pub printed_time: Option<DateTime<Utc>>,
}

impl JobOutcome {
    pub fn succeeded(job_id: JobId, printed_time: DateTime<Utc>) -> Self {
        Self {
            job_id,
            status: PrintStatus::Succeeded,
            error: String::new(),
            printed_time: Some(printed_time),
        }
    }

    /// Failed outcome; the resource URL is appended to the error text so the
    /// service operator can tell which photo was involved.
    pub fn failed(job_id: JobId, error: &BareboxError, resource_url: &str) -> Self {
        Self {
            job_id,
            status: PrintStatus::Failed,
            error: format!("{error} photo: {resource_url}"),
            printed_time: None,
        }
    }

    /// Form fields for the status PATCH. `printed_time` is omitted when unset.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("print_status", self.status.as_str().to_string()),
            ("error", self.error.clone()),
        ];
        if let Some(at) = self.printed_time {
            fields.push(("printed_time", at.to_rfc3339_opts(SecondsFormat::Micros, true)));
        }
        fields
    }
}

/// Credentials of one authenticated login.
///
/// Built by the session manager after a successful login and handed to the
/// connection loop; dropped and rebuilt on every reconnect.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    csrf_token: String,
    session_id: String,
}

impl Session {
    pub fn new(csrf_token: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            csrf_token: csrf_token.into(),
            session_id: session_id.into(),
        }
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// `Cookie` header for the streaming handshake.
    pub fn stream_cookie(&self) -> String {
        format!("sessionid={}", self.session_id)
    }

    /// `Cookie` header for state-changing API calls, which the service checks
    /// against the `X-CSRFToken` header.
    pub fn api_cookie(&self) -> String {
        format!("csrftoken={}; sessionid={}", self.csrf_token, self.session_id)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("csrf_token", &"<redacted>")
            .field("session_id", &"<redacted>")
            .finish()
    }
}
