// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Barebox Print — downloads job images to a scratch directory and hands them
// to the local spooler.  The spooler is a capability trait chosen once per
// platform; the pipeline ties fetch, print, and scratch cleanup together.

pub mod fetch;
pub mod pipeline;
pub mod spooler;

pub use fetch::ImageFetcher;
pub use pipeline::PrintPipeline;
pub use spooler::{Printer, platform_printer};
