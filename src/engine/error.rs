use thiserror::Error;

/// Fatal harness errors.
///
/// Everything here terminates the current test case. Skips are not errors —
/// they travel through [`crate::engine::decision::Verdict`] instead.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A spec referenced an (operation, codec, mode) triple that has no
    /// capability-matrix entry. This is a specification bug, not a runtime
    /// condition, and must never be silently skipped.
    #[error("no capability entry for {0}")]
    MissingCapability(String),

    /// The test-case specification itself is malformed (empty outputs,
    /// invalid mode, missing case record).
    #[error("invalid test case specification: {0}")]
    InvalidSpec(String),
}
