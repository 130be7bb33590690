// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Config file resolution and loading.

use std::path::{Path, PathBuf};

use blattwerk_core::config::EngineConfig;
use tracing::{debug, warn};

const CONFIG_FILE: &str = "config.json";

/// `$XDG_CONFIG_HOME/blattwerk/config.json`, falling back to `~/.config`.
pub fn default_config_path() -> Option<PathBuf> {
    let base = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg)
    } else {
        PathBuf::from(std::env::var("HOME").ok()?).join(".config")
    };
    Some(base.join("blattwerk").join(CONFIG_FILE))
}

/// Load the config at `path`, or the default location when `None`.
///
/// Missing, unreadable, or invalid files fall back to defaults.
pub fn load_config(path: Option<&Path>) -> EngineConfig {
    let Some(path) = path.map(Path::to_path_buf).or_else(default_config_path) else {
        return EngineConfig::default();
    };

    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(err) => {
            debug!(path = %path.display(), %err, "No config file, using defaults");
            return EngineConfig::default();
        }
    };

    let config: EngineConfig = match serde_json::from_str(&data) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), %err, "Config file is not valid JSON, using defaults");
            return EngineConfig::default();
        }
    };

    match config.validate() {
        Ok(()) => {
            debug!(path = %path.display(), "Config loaded");
            config
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "Config rejected, using defaults");
            EngineConfig::default()
        }
    }
}
