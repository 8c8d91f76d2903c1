//! Resolved per-case parameter records.
//!
//! A [`ParameterTuple`] is built fresh for each test invocation by the
//! expansion engine and never mutated after option generation. Optional
//! fields use `Option`: presence, not value truthiness, decides whether a
//! field contributes an encoder option or a name component — a zero must
//! still be emitted.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

use crate::engine::caps::Mode;
use crate::engine::metrics::MetricSpec;
use crate::spec::CaseParams;

/// Rate-control policy for an encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControl {
    Cqp,
    Cbr,
    Vbr,
}

impl RateControl {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateControl::Cqp => "cqp",
            RateControl::Cbr => "cbr",
            RateControl::Vbr => "vbr",
        }
    }
}

impl fmt::Display for RateControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_channels() -> u32 {
    1
}

/// One transcode fan-out branch. Each branch produces `channels` duplicate
/// artifacts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputDescriptor {
    pub codec: String,
    pub mode: Mode,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default = "default_channels")]
    pub channels: u32,
}

/// The fully-resolved parameter set for one test invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTuple {
    pub case: String,
    pub codec: String,
    pub mode: Mode,
    pub profile: String,
    pub rc_mode: RateControl,

    // From the case base record.
    pub source: PathBuf,
    pub width: u32,
    pub height: u32,
    pub frames: u32,
    pub format: String,
    pub reference: Option<String>,
    pub metric: Option<MetricSpec>,
    pub call_timeout: Option<u64>,

    // Dimension-controlled fields.
    pub fps: Option<u32>,
    pub gop: Option<u32>,
    pub qp: Option<u32>,
    /// MPEG-2 quantizer, mapped from the generic qp range. The option
    /// builder binds `quantizer` to this field, never to `qp` directly.
    pub mqp: Option<u32>,
    pub quality: Option<u32>,
    pub slices: Option<u32>,
    pub bframes: Option<u32>,
    pub bitrate: Option<u32>,
    pub minrate: Option<u32>,
    pub maxrate: Option<u32>,
    pub refmode: Option<u32>,
    pub refs: Option<u32>,
    pub lowpower: bool,
    pub lowdelayb: bool,
    pub loopshp: Option<u32>,
    pub looplvl: Option<u32>,

    /// Transcode fan-out branches; empty for single-stream encodes.
    pub outputs: Vec<OutputDescriptor>,
}

impl ParameterTuple {
    /// Base tuple for a case: a shallow copy of the spec record plus the
    /// codec/mode/profile the caller is exercising. Dimension fields start
    /// unset; a variant fills them in.
    pub fn from_case(
        case: &str,
        params: &CaseParams,
        codec: &str,
        mode: Mode,
        profile: &str,
    ) -> Self {
        ParameterTuple {
            case: case.to_string(),
            codec: codec.to_string(),
            mode,
            profile: profile.to_string(),
            rc_mode: RateControl::Cqp,
            source: params.source.clone(),
            width: params.width,
            height: params.height,
            frames: params.frames,
            format: params.format.clone(),
            reference: params.reference.clone(),
            metric: params.metric,
            call_timeout: params.call_timeout,
            fps: params.fps,
            gop: None,
            qp: None,
            mqp: None,
            quality: None,
            slices: None,
            bframes: None,
            bitrate: None,
            minrate: None,
            maxrate: None,
            refmode: None,
            refs: None,
            lowpower: false,
            lowdelayb: false,
            loopshp: None,
            looplvl: None,
            outputs: Vec::new(),
        }
    }
}
