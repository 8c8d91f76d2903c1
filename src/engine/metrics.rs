//! Objective quality metrics: score objects, per-case metric specs, and the
//! ffmpeg-backed probe.
//!
//! The harness never computes pixel math itself. Scores come from a
//! [`QualityProbe`] collaborator; the shipped adapter shells out to ffmpeg's
//! `psnr`/`ssim` filters over raw YUV pairs and parses the summary line.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use super::executor::Executor;

/// Per-plane PSNR, in dB.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PsnrScore {
    pub y: f64,
    pub u: f64,
    pub v: f64,
}

/// Per-plane SSIM, in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SsimScore {
    pub y: f64,
    pub u: f64,
    pub v: f64,
}

/// A computed metric score of either kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricScore {
    Psnr(PsnrScore),
    Ssim(SsimScore),
}

/// Acceptance thresholds for a case, supplied by the spec or defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetricSpec {
    Ssim { miny: f64, minu: f64, minv: f64 },
    Psnr { miny: f64, minu: f64, minv: f64 },
}

impl Default for MetricSpec {
    /// The perfect-score sentinel: exact SSIM on every plane.
    fn default() -> Self {
        MetricSpec::Ssim {
            miny: 1.0,
            minu: 1.0,
            minv: 1.0,
        }
    }
}

/// Metric computation collaborator. Treated as pure and deterministic.
pub trait QualityProbe {
    #[allow(clippy::too_many_arguments)]
    fn psnr(
        &self,
        reference: &Path,
        candidate: &Path,
        width: u32,
        height: u32,
        frames: u32,
        format: &str,
    ) -> Result<PsnrScore>;

    #[allow(clippy::too_many_arguments)]
    fn ssim(
        &self,
        reference: &Path,
        candidate: &Path,
        width: u32,
        height: u32,
        frames: u32,
        format: &str,
    ) -> Result<SsimScore>;
}

// ============================================================================
// ffmpeg adapter
// ============================================================================

/// ffmpeg pixel format for a spec-level raw format. Private to the adapter;
/// the GStreamer token maps live in `engine::formats`.
fn ffmpeg_pix_fmt(format: &str) -> Option<&'static str> {
    match format {
        "I420" => Some("yuv420p"),
        "NV12" => Some("nv12"),
        "YV12" => Some("yuv420p"),
        "P010" => Some("p010le"),
        "YUY2" => Some("yuyv422"),
        "UYVY" => Some("uyvy422"),
        "ARGB" => Some("argb"),
        "BGRA" => Some("bgra"),
        "Y800" => Some("gray"),
        _ => None,
    }
}

/// Computes PSNR/SSIM by running ffmpeg's comparison filters over the two
/// raw streams and parsing the filter summary from the captured output.
pub struct FfmpegQualityProbe<'a> {
    executor: &'a dyn Executor,
}

impl<'a> FfmpegQualityProbe<'a> {
    pub fn new(executor: &'a dyn Executor) -> Self {
        FfmpegQualityProbe { executor }
    }

    fn compare_command(
        filter: &str,
        reference: &Path,
        candidate: &Path,
        width: u32,
        height: u32,
        frames: u32,
        format: &str,
    ) -> Result<String> {
        let pix_fmt = ffmpeg_pix_fmt(format)
            .ok_or_else(|| anyhow!("no ffmpeg pixel format for {format}"))?;
        Ok(format!(
            "ffmpeg -hide_banner -f rawvideo -pix_fmt {pix_fmt} -s:v {width}x{height} \
             -i {candidate} -f rawvideo -pix_fmt {pix_fmt} -s:v {width}x{height} \
             -i {reference} -lavfi {filter} -vframes {frames} -f null -",
            candidate = candidate.display(),
            reference = reference.display(),
        ))
    }
}

impl QualityProbe for FfmpegQualityProbe<'_> {
    fn psnr(
        &self,
        reference: &Path,
        candidate: &Path,
        width: u32,
        height: u32,
        frames: u32,
        format: &str,
    ) -> Result<PsnrScore> {
        let cmd =
            Self::compare_command("psnr", reference, candidate, width, height, frames, format)?;
        let output = self.executor.call(&cmd).context("psnr computation failed")?;
        parse_psnr_summary(&output).ok_or_else(|| anyhow!("no PSNR summary in ffmpeg output"))
    }

    fn ssim(
        &self,
        reference: &Path,
        candidate: &Path,
        width: u32,
        height: u32,
        frames: u32,
        format: &str,
    ) -> Result<SsimScore> {
        let cmd =
            Self::compare_command("ssim", reference, candidate, width, height, frames, format)?;
        let output = self.executor.call(&cmd).context("ssim computation failed")?;
        parse_ssim_summary(&output).ok_or_else(|| anyhow!("no SSIM summary in ffmpeg output"))
    }
}

// ============================================================================
// Summary-line parsing
// ============================================================================

/// Extract `key:value` where value is a float, from a whitespace-split token.
fn float_field(token: &str, key: &str) -> Option<f64> {
    let rest = token.strip_prefix(key)?.strip_prefix(':')?;
    rest.parse::<f64>().ok()
}

/// Parse the `[Parsed_psnr_0 ...] PSNR y:.. u:.. v:.. average:..` line.
pub fn parse_psnr_summary(output: &str) -> Option<PsnrScore> {
    let line = output.lines().rev().find(|l| l.contains("PSNR y:"))?;
    let mut y = None;
    let mut u = None;
    let mut v = None;
    for token in line.split_whitespace() {
        if let Some(val) = float_field(token, "y") {
            y = Some(val);
        } else if let Some(val) = float_field(token, "u") {
            u = Some(val);
        } else if let Some(val) = float_field(token, "v") {
            v = Some(val);
        }
    }
    Some(PsnrScore {
        y: y?,
        u: u?,
        v: v?,
    })
}

/// Parse the `[Parsed_ssim_0 ...] SSIM Y:.. (..) U:.. (..) V:.. (..) All:..`
/// line. Parenthesized dB figures are skipped.
pub fn parse_ssim_summary(output: &str) -> Option<SsimScore> {
    let line = output.lines().rev().find(|l| l.contains("SSIM Y:"))?;
    let mut y = None;
    let mut u = None;
    let mut v = None;
    for token in line.split_whitespace() {
        if let Some(val) = float_field(token, "Y") {
            y = Some(val);
        } else if let Some(val) = float_field(token, "U") {
            u = Some(val);
        } else if let Some(val) = float_field(token, "V") {
            v = Some(val);
        }
    }
    Some(SsimScore {
        y: y?,
        u: u?,
        v: v?,
    })
}
