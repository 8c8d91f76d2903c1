// Global configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub baseline: BaselineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Where per-run artifact directories are created.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Default pipeline timeout in seconds; per-case overrides win.
    #[serde(default)]
    pub call_timeout_s: Option<u64>,

    /// Platform filter tags applied to every run.
    #[serde(default)]
    pub filters: Vec<String>,

    /// Platform tag of the machine under test (gates low-power variants).
    #[serde(default)]
    pub platform: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            artifact_dir: default_artifact_dir(),
            call_timeout_s: None,
            filters: Vec::new(),
            platform: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// Baseline store location; defaults to the user data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Record missing baseline contexts instead of failing them.
    #[serde(default)]
    pub rebase: bool,
}

fn default_artifact_dir() -> PathBuf {
    std::env::temp_dir()
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vacheck").join("config.toml"))
    }

    /// Load the user config; a missing file yields defaults.
    pub fn load() -> Result<Self> {
        let Some(path) = Self::config_path() else {
            return Ok(Config::default());
        };
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
    }
}
