// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fetch → print → cleanup.

use tracing::{instrument, warn};

use barebox_core::error::Result;

use crate::fetch::ImageFetcher;
use crate::spooler::Printer;

/// Runs one job's image through the fetcher and the printer.
pub struct PrintPipeline {
    fetcher: ImageFetcher,
    printer: Box<dyn Printer>,
}

impl PrintPipeline {
    pub fn new(fetcher: ImageFetcher, printer: Box<dyn Printer>) -> Self {
        Self { fetcher, printer }
    }

    /// Download `resource_url` and print it.
    ///
    /// The printer is never invoked if the download fails.  Once the image is
    /// on disk the scratch file is removed whatever the print result.
    #[instrument(skip(self), fields(printer = self.printer.name()))]
    pub async fn run(&self, resource_url: &str) -> Result<()> {
        let path = self.fetcher.fetch(resource_url).await?;

        let printed = self.printer.print(&path).await;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "scratch file not removed");
        }

        printed
    }
}
