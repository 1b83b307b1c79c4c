// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retry policy for talking to the photo service.
//
// Classifies errors into Transient (retry after a fixed delay, forever) and
// Permanent (give up).  Logging in is the only caller that retries: a service
// that is down is waited out, wrong credentials are not.

use std::time::Duration;

use barebox_core::error::BareboxError;
use tracing::{debug, info};

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay between attempts.  Not increased between attempts.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(10),
        }
    }
}

/// Classification of errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Service unreachable, connection dropped, odd server response.
    Transient,
    /// Retrying cannot help (bad credentials, bad config, bad data).
    Permanent,
}

/// Result of evaluating whether to retry.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after this delay.
    RetryAfter(Duration),
    /// Do not retry.
    GiveUp(ErrorClass),
}

/// Classify a `BareboxError` into an `ErrorClass` for retry decisions.
pub fn classify_error(err: &BareboxError) -> ErrorClass {
    match err {
        BareboxError::Transport(_) => ErrorClass::Transient,
        BareboxError::Report(_) => ErrorClass::Transient,

        BareboxError::Auth(_) => ErrorClass::Permanent,
        BareboxError::Config(_) => ErrorClass::Permanent,
        BareboxError::MalformedMessage(_) => ErrorClass::Permanent,
        BareboxError::Fetch(_) => ErrorClass::Permanent,
        BareboxError::Spooler(_) => ErrorClass::Permanent,
        BareboxError::PlatformUnavailable => ErrorClass::Permanent,

        BareboxError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                ErrorClass::Permanent
            }
            _ => ErrorClass::Transient,
        },
    }
}

/// Decide whether to retry.  Transient errors are retried indefinitely.
pub fn should_retry(err: &BareboxError, config: &RetryConfig) -> RetryDecision {
    match classify_error(err) {
        ErrorClass::Permanent => {
            info!("permanent error, not retrying");
            RetryDecision::GiveUp(ErrorClass::Permanent)
        }
        ErrorClass::Transient => {
            debug!(delay_ms = config.delay.as_millis(), "scheduling retry");
            RetryDecision::RetryAfter(config.delay)
        }
    }
}
