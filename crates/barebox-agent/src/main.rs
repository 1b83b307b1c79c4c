// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Barebox print agent
//
// Entry point. Loads the config, initialises logging, picks the platform
// printer, and runs the reconnect loop until interrupted.  An interrupt
// cancels a token the supervisor checks between jobs, so a job that is
// printing still gets reported and cleaned up before the process exits.

mod config_file;
mod logging;

use std::process::ExitCode;

use barebox_link::Supervisor;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match config_file::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("barebox: {e}");
            return ExitCode::from(2);
        }
    };

    let _log_guard = match logging::init(&config.log_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("barebox: {e}");
            return ExitCode::from(2);
        }
    };

    tracing::info!(login_url = %config.login_url, "Barebox print agent starting");

    let printer = barebox_print::platform_printer(&config);
    tracing::info!(printer = printer.name(), "printer selected");

    let supervisor = match Supervisor::from_config(&config, printer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("interrupt received, finishing current job");
        interrupt.cancel();
    });

    match supervisor.run(shutdown).await {
        Ok(()) => {
            tracing::debug!("exit with interrupt");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "stopping");
            ExitCode::FAILURE
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }
}
