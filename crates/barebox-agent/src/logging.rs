// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Logging: console plus a rotating file in the configured log directory.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use barebox_core::error::{BareboxError, Result};

const LOG_FILE_PREFIX: &str = "barebox_printing";

/// Rotated files kept on disk.
const MAX_LOG_FILES: usize = 3;

/// Used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info,barebox_core=debug,barebox_print=debug,barebox_link=debug,barebox=debug";

/// Install the global subscriber.  The returned guard flushes the file
/// writer on drop and must be held for the life of the process.
pub fn init(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let appender = Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .map_err(|e| BareboxError::Config(format!("log file in {}: {e}", log_dir.display())))?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .map_err(|e| BareboxError::Config(format!("logging already initialised: {e}")))?;

    Ok(guard)
}
