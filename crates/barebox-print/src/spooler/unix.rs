// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unix spooler: submits the file to the print queue via `lpr` (or whatever
// command is configured) and inspects the command's output.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use barebox_core::error::{BareboxError, Result};

use super::Printer;

/// Marker the print-queue tools put in their diagnostics on failure.
const ERROR_MARKER: &str = "Error";

pub struct UnixSpooler {
    program: String,
    args: Vec<String>,
}

impl UnixSpooler {
    /// Split a command line such as `lpr -o fit-to-page` into program and
    /// leading arguments.  The file path is always appended last.
    pub fn from_command_line(command: &str) -> Self {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next().unwrap_or_else(|| "lpr".into());
        Self {
            program,
            args: words.collect(),
        }
    }
}

#[async_trait]
impl Printer for UnixSpooler {
    fn name(&self) -> &str {
        &self.program
    }

    async fn print(&self, path: &Path) -> Result<()> {
        debug!(program = %self.program, path = %path.display(), "printing on unix system");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| BareboxError::Spooler(format!("cannot run {}: {e}", self.program)))?;

        let mut diagnostic = String::from_utf8_lossy(&output.stdout).into_owned();
        diagnostic.push_str(&String::from_utf8_lossy(&output.stderr));
        let diagnostic = diagnostic.trim();

        if diagnostic.contains(ERROR_MARKER) {
            return Err(BareboxError::Spooler(diagnostic.to_string()));
        }
        if !output.status.success() {
            return Err(BareboxError::Spooler(format!(
                "{} exited with {}: {diagnostic}",
                self.program, output.status
            )));
        }

        info!(path = %path.display(), "file submitted to print queue");
        Ok(())
    }
}
