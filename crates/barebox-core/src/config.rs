// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Agent configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BareboxError, Result};

/// Path of the job-notification endpoint, relative to `streaming_base_url`.
pub const STREAM_ENDPOINT: &str = "print_server?subscribe-user";

/// Account the agent logs in as.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Settings read from the agent's JSON config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Login page, e.g. `http://example.com/accounts/login/`.
    pub login_url: String,
    /// WebSocket base, e.g. `ws://example.com/ws/`.
    pub streaming_base_url: String,
    /// Photo status collection, e.g. `http://example.com/api/v1/photos/`.
    pub status_url: String,
    pub credentials: Credentials,
    /// Where downloaded images are staged before printing.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Fixed delay between login attempts while the service is unreachable.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// The stream is considered dead after this long without any frame.
    /// Heartbeats keep a healthy connection well inside it.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Spooler command used on unix-like systems.
    #[serde(default = "default_print_command")]
    pub print_command: String,
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("tmp_images")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_retry_delay_secs() -> u64 {
    10
}

fn default_idle_timeout_secs() -> u64 {
    90
}

fn default_print_command() -> String {
    "lpr".into()
}

impl AgentConfig {
    /// Read and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without validating it, so overrides can still
    /// be applied.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            BareboxError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&data)
            .map_err(|e| BareboxError::Config(format!("{}: {e}", path.display())))
    }

    /// Replace credentials with values from `lookup` (normally the process
    /// environment) when present.
    pub fn override_credentials(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(login) = lookup("BAREBOX_LOGIN") {
            self.credentials.login = login;
        }
        if let Some(password) = lookup("BAREBOX_PASSWORD") {
            self.credentials.password = password;
        }
    }

    /// Check that every URL parses and is usable as a base for the paths the
    /// agent appends to it.
    pub fn validate(&self) -> Result<()> {
        check_url("login_url", &self.login_url, &["http", "https"])?;
        check_base_url("streaming_base_url", &self.streaming_base_url, &["ws", "wss"])?;
        check_base_url("status_url", &self.status_url, &["http", "https"])?;
        if self.credentials.login.is_empty() {
            return Err(BareboxError::Config("credentials.login is empty".into()));
        }
        if self.retry_delay_secs == 0 {
            return Err(BareboxError::Config("retry_delay_secs must be at least 1".into()));
        }
        if self.idle_timeout_secs == 0 {
            return Err(BareboxError::Config("idle_timeout_secs must be at least 1".into()));
        }
        Ok(())
    }

    /// Full URL of the job-notification stream.
    pub fn stream_url(&self) -> String {
        format!("{}{}", self.streaming_base_url, STREAM_ENDPOINT)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

fn check_url(field: &str, value: &str, schemes: &[&str]) -> Result<Url> {
    let url = Url::parse(value)
        .map_err(|e| BareboxError::Config(format!("{field} {value:?}: {e}")))?;
    if !schemes.contains(&url.scheme()) {
        return Err(BareboxError::Config(format!(
            "{field} must use one of {schemes:?}, got {:?}",
            url.scheme()
        )));
    }
    Ok(url)
}

fn check_base_url(field: &str, value: &str, schemes: &[&str]) -> Result<Url> {
    let url = check_url(field, value, schemes)?;
    if !value.ends_with('/') {
        return Err(BareboxError::Config(format!("{field} must end with '/'")));
    }
    Ok(url)
}
