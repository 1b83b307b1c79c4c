// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image fetcher.
//
// Streams a remote image into the scratch directory.  The file is named after
// the last path segment of the URL, so the same URL always lands on the same
// scratch path.  Removing the file after printing is the pipeline's job.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};
use url::Url;

use barebox_core::error::{BareboxError, Result};

/// Upper bound for a single image download.
const FETCH_TIMEOUT_SECS: u64 = 120;

/// Name used when the URL has no usable trailing segment.
const FALLBACK_FILE_NAME: &str = "image";

pub struct ImageFetcher {
    client: reqwest::Client,
    scratch_dir: PathBuf,
}

impl ImageFetcher {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| BareboxError::Transport(format!("HTTP client: {e}")))?;
        Ok(Self::with_client(client, scratch_dir))
    }

    pub fn with_client(client: reqwest::Client, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Scratch path the image at `url` is downloaded to.
    pub fn scratch_path(&self, url: &str) -> Result<PathBuf> {
        let parsed = Url::parse(url)
            .map_err(|e| BareboxError::Fetch(format!("invalid image URL: {e}")))?;
        Ok(self.scratch_dir.join(scratch_file_name(&parsed)))
    }

    /// Download `url` into the scratch directory and return the local path.
    ///
    /// Fails with [`BareboxError::Fetch`] if the server cannot be reached or
    /// does not answer `200 OK`.  A partially written file is removed.
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<PathBuf> {
        let path = self.scratch_path(url)?;

        debug!("trying to fetch image");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BareboxError::Fetch(format!("cannot connect: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(BareboxError::Fetch(format!(
                "response status {status} is not 200 OK"
            )));
        }

        tokio::fs::create_dir_all(&self.scratch_dir).await?;

        match write_body(response, &path).await {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes, "image downloaded");
                Ok(path)
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %rm, "partial download not removed");
                }
                Err(e)
            }
        }
    }
}

async fn write_body(response: reqwest::Response, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut body = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| BareboxError::Fetch(format!("body read: {e}")))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

/// Last path segment of the URL, restricted to characters that are safe in a
/// file name on every platform.
fn scratch_file_name(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    let name: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.is_empty() || name.chars().all(|c| c == '.') {
        FALLBACK_FILE_NAME.to_string()
    } else {
        name
    }
}
