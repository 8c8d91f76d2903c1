//! Historical quality baselines.
//!
//! Encode checks gate PSNR against a recorded per-context baseline rather
//! than absolute thresholds. The store is a JSON file keyed by reference
//! context; rebase mode records contexts it has not seen before.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use super::metrics::PsnrScore;
use super::validate::ValidationFailure;

/// Permitted regression below a recorded baseline, in dB.
pub const PSNR_MARGIN_DB: f64 = 0.2;

/// Baseline key: the case name scoped by the fan-out reference context.
/// Single-stream checks have an empty context.
pub fn context_key(case: &str, refctx: &[(usize, usize)]) -> String {
    let mut key = case.to_string();
    for (branch, channel) in refctx {
        key.push_str(&format!(":{branch}:{channel}"));
    }
    key
}

#[derive(Debug)]
pub struct BaselineStore {
    path: PathBuf,
    records: BTreeMap<String, PsnrScore>,
    rebase: bool,
    dirty: bool,
}

impl BaselineStore {
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("vacheck")
            .join("baseline.json")
    }

    /// Load the store; a missing file is an empty store.
    pub fn load(path: &Path, rebase: bool) -> Result<Self> {
        let records = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read baseline {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse baseline {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(BaselineStore {
            path: path.to_path_buf(),
            records,
            rebase,
            dirty: false,
        })
    }

    /// Persist recorded entries. No-op unless something changed.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(&self.records)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write baseline {}", self.path.display()))?;
        self.dirty = false;
        Ok(())
    }

    pub fn get(&self, context: &str) -> Option<&PsnrScore> {
        self.records.get(context)
    }

    /// Gate a PSNR score against the recorded baseline for `context`.
    ///
    /// Unknown contexts fail unless rebase mode records them. Known contexts
    /// fail when any plane regresses more than the margin; a better score
    /// updates the record in rebase mode.
    pub fn check_psnr(
        &mut self,
        score: &PsnrScore,
        context: &str,
    ) -> Result<(), ValidationFailure> {
        match self.records.get(context).copied() {
            None => {
                if self.rebase {
                    info!(context, "recording new psnr baseline");
                    self.records.insert(context.to_string(), *score);
                    self.dirty = true;
                    Ok(())
                } else {
                    Err(ValidationFailure::MissingBaseline(context.to_string()))
                }
            }
            Some(baseline) => {
                for (plane, actual, recorded) in [
                    ("y", score.y, baseline.y),
                    ("u", score.u, baseline.u),
                    ("v", score.v, baseline.v),
                ] {
                    if actual < recorded - PSNR_MARGIN_DB {
                        return Err(ValidationFailure::BelowBaseline {
                            plane,
                            actual,
                            baseline: recorded,
                            margin: PSNR_MARGIN_DB,
                        });
                    }
                }
                if self.rebase
                    && (score.y > baseline.y || score.u > baseline.u || score.v > baseline.v)
                {
                    info!(context, "raising psnr baseline");
                    self.records.insert(context.to_string(), *score);
                    self.dirty = true;
                }
                Ok(())
            }
        }
    }
}
