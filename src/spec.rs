//! Declarative test-spec loading.
//!
//! A spec file maps case names to base parameters. Loaded once per run and
//! shared read-only across every parameterization derived from it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::engine::metrics::MetricSpec;

fn default_format() -> String {
    "I420".to_string()
}

/// Base parameters for one named case.
#[derive(Debug, Clone, Deserialize)]
pub struct CaseParams {
    /// Raw source clip.
    pub source: PathBuf,
    pub width: u32,
    pub height: u32,
    pub frames: u32,

    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default)]
    pub fps: Option<u32>,

    /// Frame-count override for bitrate-controlled modes. Bitrate accuracy
    /// needs longer clips than quality checks do.
    #[serde(default)]
    pub brframes: Option<u32>,

    /// Per-case bitrate hint (kbps) for bitrate-controlled dimensions.
    #[serde(default)]
    pub bitrate: Option<u32>,

    /// Explicit reference for metric comparison; `{case}` is substituted.
    /// Absent means the source is the reference.
    #[serde(default)]
    pub reference: Option<String>,

    #[serde(default)]
    pub metric: Option<MetricSpec>,

    /// Per-case pipeline timeout override, in seconds.
    #[serde(default)]
    pub call_timeout: Option<u64>,
}

/// A loaded spec table. Immutable once loaded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestSpec {
    #[serde(flatten)]
    pub cases: BTreeMap<String, CaseParams>,
}

impl TestSpec {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read spec {}", path.display()))?;
        let spec: TestSpec = toml::from_str(&raw)
            .with_context(|| format!("failed to parse spec {}", path.display()))?;
        Ok(spec)
    }

    pub fn get(&self, case: &str) -> Option<&CaseParams> {
        self.cases.get(case)
    }

    pub fn case_names(&self) -> impl Iterator<Item = &str> {
        self.cases.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }
}

/// All spec files under a directory, sorted for a stable case order.
pub fn discover_specs(dir: &Path) -> Vec<PathBuf> {
    let mut specs: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "toml"))
        .map(|e| e.into_path())
        .collect();
    specs.sort();
    specs
}
