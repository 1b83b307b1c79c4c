// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub spooler for targets with neither a unix print queue nor GDI.

use std::path::Path;

use async_trait::async_trait;

use barebox_core::error::{BareboxError, Result};

use super::Printer;

pub struct StubSpooler;

#[async_trait]
impl Printer for StubSpooler {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn print(&self, _path: &Path) -> Result<()> {
        tracing::warn!("Printer::print called on stub spooler");
        Err(BareboxError::PlatformUnavailable)
    }
}
