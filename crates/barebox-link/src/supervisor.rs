// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reconnect loop: log in, stream jobs until the connection ends, log in
// again.  One session and one connection at a time.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use barebox_core::AgentConfig;
use barebox_core::error::Result;
use barebox_print::{ImageFetcher, PrintPipeline, Printer};

use crate::connection::{Disconnect, StreamClient};
use crate::handler::JobHandler;
use crate::report::StatusReporter;
use crate::session::SessionManager;

pub struct Supervisor {
    sessions: SessionManager,
    stream: StreamClient,
    handler: JobHandler,
}

impl Supervisor {
    pub fn new(sessions: SessionManager, stream: StreamClient, handler: JobHandler) -> Self {
        Self {
            sessions,
            stream,
            handler,
        }
    }

    /// Wire every component from the config around the given printer.
    pub fn from_config(config: &AgentConfig, printer: Box<dyn Printer>) -> Result<Self> {
        let pipeline = PrintPipeline::new(ImageFetcher::new(&config.scratch_dir)?, printer);
        let handler = JobHandler::new(pipeline, StatusReporter::from_config(config)?);
        Ok(Self::new(
            SessionManager::from_config(config)?,
            StreamClient::from_config(config),
            handler,
        ))
    }

    /// Run until the credentials are rejected or `shutdown` fires.
    ///
    /// Every disconnect, whatever its cause, leads to exactly one new login
    /// followed by one new connection.  A failed handshake waits the retry
    /// delay first so an unreachable stream endpoint is not hammered.
    /// Shutdown interrupts logins, waits and idle connections, never a job
    /// in progress; `Ok(())` means it was honoured.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        loop {
            let session = tokio::select! {
                _ = shutdown.cancelled() => break,
                session = self.sessions.acquire() => session?,
            };

            let reason = self.stream.run(&session, &self.handler, &shutdown).await;
            drop(session);

            match reason {
                Disconnect::Shutdown => break,
                Disconnect::ConnectFailed(_) => {
                    let delay = self.sessions.retry_config().delay;
                    warn!(reason = %reason, delay_secs = delay.as_secs_f32(), "stream unavailable");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                _ => info!(reason = %reason, "connection terminated, logging in again"),
            }
        }

        debug!("supervisor stopped");
        Ok(())
    }
}
