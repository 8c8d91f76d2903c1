//! Post-execution validation: bitrate tolerance bands and quality
//! thresholds.
//!
//! Tolerances are fixed policy constants, not per-spec configuration. A
//! violation is fatal for the case; the computed actuals travel in the error
//! so the runner can surface them before aborting.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::metrics::{MetricScore, MetricSpec};
use super::params::{ParameterTuple, RateControl};

/// Acceptable CBR deviation from target.
pub const CBR_BITRATE_TOLERANCE: f64 = 0.10;
/// VBR lower bound as a fraction of minrate.
pub const VBR_MINRATE_FACTOR: f64 = 0.75;
/// VBR upper bound as a multiple of maxrate.
pub const VBR_MAXRATE_TOLERANCE: f64 = 1.10;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationFailure {
    #[error(
        "bitrate {actual:.2} kbps vs target {target} kbps: gap {gap_pct:.2}% exceeds 10% tolerance"
    )]
    CbrGap {
        actual: f64,
        target: u32,
        gap_pct: f64,
    },

    #[error(
        "bitrate {actual:.2} kbps outside [{low:.2}, {high:.2}] kbps (minrate {minrate}, maxrate {maxrate})"
    )]
    VbrRange {
        actual: f64,
        low: f64,
        high: f64,
        minrate: u32,
        maxrate: u32,
    },

    #[error("{metric} {plane}-plane {actual:.4} below minimum {min:.4}")]
    BelowThreshold {
        metric: &'static str,
        plane: &'static str,
        actual: f64,
        min: f64,
    },

    #[error("metric kind mismatch: spec wants {expected}, probe produced {actual}")]
    MetricKindMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("no baseline for context '{0}' (re-run with rebase to record one)")]
    MissingBaseline(String),

    #[error("psnr {plane}-plane {actual:.4} below baseline {baseline:.4} (margin {margin})")]
    BelowBaseline {
        plane: &'static str,
        actual: f64,
        baseline: f64,
        margin: f64,
    },

    #[error("invalid test case specification: {0}")]
    InvalidCase(String),
}

// ============================================================================
// Bitrate
// ============================================================================

/// Actual bitrate in kilobits/sec implied by an artifact.
pub fn actual_bitrate_kbps(size_bytes: u64, fps: u32, frames: u32) -> f64 {
    size_bytes as f64 * 8.0 * f64::from(fps) / 1024.0 / f64::from(frames)
}

/// Computed bitrate details, logged and reported whether or not the band
/// check applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BitrateReport {
    pub size_bytes: u64,
    pub actual_kbps: f64,
    pub gap_pct: Option<f64>,
}

/// Rate-control-specific bitrate acceptance.
///
/// CBR: within 10% of target. VBR: within 75% of minrate and 110% of
/// maxrate. Constant-quantizer modes carry no band and always pass.
pub fn check_bitrate(
    t: &ParameterTuple,
    size_bytes: u64,
) -> Result<BitrateReport, ValidationFailure> {
    match t.rc_mode {
        RateControl::Cqp => Ok(BitrateReport {
            size_bytes,
            actual_kbps: 0.0,
            gap_pct: None,
        }),
        RateControl::Cbr => {
            let (fps, target) = bitrate_fields(t)?;
            let actual = actual_bitrate_kbps(size_bytes, fps, t.frames);
            let gap = (actual - f64::from(target)).abs() / f64::from(target);
            info!(
                case = %t.case,
                size_encoded = size_bytes,
                bitrate_actual = %format!("{actual:.2}"),
                bitrate_gap = %format!("{:.2}%", gap * 100.0),
                "cbr bitrate check"
            );
            if gap > CBR_BITRATE_TOLERANCE {
                return Err(ValidationFailure::CbrGap {
                    actual,
                    target,
                    gap_pct: gap * 100.0,
                });
            }
            Ok(BitrateReport {
                size_bytes,
                actual_kbps: actual,
                gap_pct: Some(gap * 100.0),
            })
        }
        RateControl::Vbr => {
            let (fps, _) = bitrate_fields(t)?;
            let minrate = t.minrate.ok_or_else(|| {
                ValidationFailure::InvalidCase(format!("case '{}': vbr without minrate", t.case))
            })?;
            let maxrate = t.maxrate.ok_or_else(|| {
                ValidationFailure::InvalidCase(format!("case '{}': vbr without maxrate", t.case))
            })?;
            let actual = actual_bitrate_kbps(size_bytes, fps, t.frames);
            let low = f64::from(minrate) * VBR_MINRATE_FACTOR;
            let high = f64::from(maxrate) * VBR_MAXRATE_TOLERANCE;
            info!(
                case = %t.case,
                size_encoded = size_bytes,
                bitrate_actual = %format!("{actual:.2}"),
                "vbr bitrate check"
            );
            if actual < low || actual > high {
                return Err(ValidationFailure::VbrRange {
                    actual,
                    low,
                    high,
                    minrate,
                    maxrate,
                });
            }
            Ok(BitrateReport {
                size_bytes,
                actual_kbps: actual,
                gap_pct: None,
            })
        }
    }
}

fn bitrate_fields(t: &ParameterTuple) -> Result<(u32, u32), ValidationFailure> {
    let fps = t.fps.ok_or_else(|| {
        ValidationFailure::InvalidCase(format!("case '{}': bitrate check without fps", t.case))
    })?;
    let target = t.bitrate.ok_or_else(|| {
        ValidationFailure::InvalidCase(format!("case '{}': bitrate check without target", t.case))
    })?;
    Ok((fps, target))
}

// ============================================================================
// Quality
// ============================================================================

/// Reference selection and comparison-format resolution.
///
/// With no explicit reference the source is the reference and comparison
/// happens in the source's native format. An explicit reference is assumed
/// to already be in the conversion target's format.
pub fn resolve_reference(
    source: &Path,
    reference: Option<&str>,
    case: &str,
    source_format: &str,
    csc_target: Option<&str>,
) -> (PathBuf, String) {
    match reference {
        Some(template) => {
            let path = PathBuf::from(template.replace("{case}", case));
            let format = csc_target.unwrap_or(source_format).to_string();
            (path, format)
        }
        None => (source.to_path_buf(), source_format.to_string()),
    }
}

fn plane_check(
    metric: &'static str,
    plane: &'static str,
    actual: f64,
    min: f64,
) -> Result<(), ValidationFailure> {
    if actual < min {
        return Err(ValidationFailure::BelowThreshold {
            metric,
            plane,
            actual,
            min,
        });
    }
    Ok(())
}

/// Compare a computed score against the case's metric spec, per plane.
pub fn check_metric(spec: &MetricSpec, score: &MetricScore) -> Result<(), ValidationFailure> {
    match (spec, score) {
        (MetricSpec::Ssim { miny, minu, minv }, MetricScore::Ssim(s)) => {
            plane_check("ssim", "y", s.y, *miny)?;
            plane_check("ssim", "u", s.u, *minu)?;
            plane_check("ssim", "v", s.v, *minv)
        }
        (MetricSpec::Psnr { miny, minu, minv }, MetricScore::Psnr(s)) => {
            plane_check("psnr", "y", s.y, *miny)?;
            plane_check("psnr", "u", s.u, *minu)?;
            plane_check("psnr", "v", s.v, *minv)
        }
        (MetricSpec::Ssim { .. }, MetricScore::Psnr(_)) => {
            Err(ValidationFailure::MetricKindMismatch {
                expected: "ssim",
                actual: "psnr",
            })
        }
        (MetricSpec::Psnr { .. }, MetricScore::Ssim(_)) => {
            Err(ValidationFailure::MetricKindMismatch {
                expected: "psnr",
                actual: "ssim",
            })
        }
    }
}
