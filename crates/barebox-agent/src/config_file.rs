// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Config file discovery.

use std::path::{Path, PathBuf};

use barebox_core::AgentConfig;
use barebox_core::error::Result;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "BAREBOX_CONFIG";

pub const DEFAULT_CONFIG_FILE: &str = "barebox.json";

/// Load the config from `$BAREBOX_CONFIG` (or `./barebox.json`), apply
/// credential overrides from the environment, and anchor relative directories
/// next to the config file.
pub fn load() -> Result<AgentConfig> {
    let env = |key: &str| std::env::var(key).ok();
    let path = config_path(env);

    let mut config = AgentConfig::read(&path)?;
    config.override_credentials(env);
    config.validate()?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    anchor_dirs(&mut config, base);
    Ok(config)
}

pub fn config_path(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup(CONFIG_ENV)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

fn anchor_dirs(config: &mut AgentConfig, base: &Path) {
    if config.scratch_dir.is_relative() {
        config.scratch_dir = base.join(&config.scratch_dir);
    }
    if config.log_dir.is_relative() {
        config.log_dir = base.join(&config.log_dir);
    }
}
