// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print dispatch.
//
// The OS print facility differs per platform: unix-like systems shell out to
// the print-queue command, Windows draws the bitmap onto the default
// printer's device context.  Callers only see the `Printer` trait; the
// concrete spooler is picked once at startup by `platform_printer`.

use std::path::Path;

use async_trait::async_trait;

use barebox_core::AgentConfig;
use barebox_core::error::Result;

#[cfg(unix)]
pub mod unix;

#[cfg(windows)]
pub mod windows;

#[cfg(not(any(unix, windows)))]
pub mod stub;

/// Something that can put a local image file on paper.
#[async_trait]
pub trait Printer: Send + Sync {
    /// Short name for logs (e.g. "lpr", "windows-gdi").
    fn name(&self) -> &str;

    /// Print the file at `path`.  Fails with `BareboxError::Spooler` carrying
    /// the spooler's diagnostic text.
    async fn print(&self, path: &Path) -> Result<()>;
}

/// The spooler for the platform this binary was built for.
pub fn platform_printer(config: &AgentConfig) -> Box<dyn Printer> {
    #[cfg(unix)]
    {
        Box::new(unix::UnixSpooler::from_command_line(&config.print_command))
    }
    #[cfg(windows)]
    {
        let _ = config;
        Box::new(windows::WindowsSpooler)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = config;
        Box::new(stub::StubSpooler)
    }
}
