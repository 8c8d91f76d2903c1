//! Artifact storage for one run.
//!
//! All artifacts for a run land in a uuid-suffixed directory so concurrent
//! runs never collide; within a run, deterministic artifact names (see
//! `engine::options`) dedup logically-identical cases.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Use (and create) an explicit directory.
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create artifact dir {}", root.display()))?;
        Ok(ArtifactStore { root })
    }

    /// Fresh per-run directory under `base`.
    pub fn for_run(base: &Path) -> Result<Self> {
        Self::new(base.join(format!("vacheck_{}", Uuid::new_v4())))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Drop an intermediate artifact. Best-effort: a failed purge is logged,
    /// not fatal — the per-run directory keeps stale files contained.
    pub fn purge(&self, path: &Path) {
        if let Err(err) = fs::remove_file(path) {
            warn!(path = %path.display(), %err, "failed to purge artifact");
        }
    }
}
