// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Barebox Link — everything that talks to the photo service: cookie login,
// the job-notification WebSocket, per-message job handling, and status
// reports.  `Supervisor` ties them into the self-healing reconnect loop.

pub mod connection;
pub mod handler;
pub mod report;
pub mod retry;
pub mod session;
pub mod supervisor;

pub use connection::{Disconnect, StreamClient};
pub use handler::{Handled, JobHandler};
pub use report::StatusReporter;
pub use session::SessionManager;
pub use supervisor::Supervisor;
