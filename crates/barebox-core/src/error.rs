// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Barebox.

use thiserror::Error;

/// Top-level error type for all Barebox operations.
#[derive(Debug, Error)]
pub enum BareboxError {
    // -- Service link errors --
    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("malformed job message: {0:?}")]
    MalformedMessage(String),

    #[error("status report failed: {0}")]
    Report(String),

    // -- Print errors --
    #[error("image fetching error: {0}")]
    Fetch(String),

    #[error("spooler error: {0}")]
    Spooler(String),

    #[error("printing not available on this platform")]
    PlatformUnavailable,

    // -- Configuration --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BareboxError>;
