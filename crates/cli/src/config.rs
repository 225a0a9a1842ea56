//! JSON configuration in the user config directory
//!
//! Lives at `<config dir>/mdpdf/config.json`. Created with defaults on
//! first load; unreadable or corrupt files fall back to defaults with a
//! warning instead of aborting.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Watch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Seconds of idle time before a conversion fires
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,

    /// Watch subdirectories
    #[serde(default)]
    pub recursive: bool,

    /// File extensions that qualify for conversion
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delay_secs: default_delay_secs(),
            recursive: false,
            extensions: default_extensions(),
        }
    }
}

fn default_delay_secs() -> u64 {
    60
}

fn default_extensions() -> Vec<String> {
    vec![".md".to_string()]
}

/// Path of the config file, if a config directory can be determined
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mdpdf").join("config.json"))
}

/// Load the configuration, creating the file with defaults when missing
pub fn load() -> Config {
    match config_file_path() {
        Some(path) => load_from(&path),
        None => {
            warn!("could not determine config directory, using defaults");
            Config::default()
        }
    }
}

/// Load from an explicit path (separated out for tests)
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        let config = Config::default();
        if let Err(e) = save_to(path, &config) {
            warn!("could not write default config to {}: {:#}", path.display(), e);
        }
        return config;
    }

    let parsed = fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|text| serde_json::from_str(&text).map_err(anyhow::Error::from));

    match parsed {
        Ok(config) => config,
        Err(e) => {
            warn!(
                "error loading config from {}: {:#}, using defaults",
                path.display(),
                e
            );
            Config::default()
        }
    }
}

/// Persist the configuration, creating parent directories as needed
pub fn save_to(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
