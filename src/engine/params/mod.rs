//! Parameter expansion: spec table × test dimension → ordered tuples.
//!
//! The caller enumerates a test's independent dimensions (rate-control
//! variant per case); expansion merges the case's base record with the
//! dimension's overrides and constants through a pure function. Identical
//! inputs always produce identical tuples — artifact names derive from them,
//! and caching depends on that.

pub mod types;

pub use types::{OutputDescriptor, ParameterTuple, RateControl};

use tracing::warn;

use super::caps::Mode;
use super::error::HarnessError;
use crate::spec::TestSpec;

/// VBR caps the bitrate at this multiple of the target rate, which
/// approximates a 50% rate-control target percentage. Policy constant.
pub const VBR_MAXRATE_FACTOR: u32 = 2;

/// Map a generic 0-51 qp onto the MPEG-2 quantizer scale (2-62).
fn mpeg2_quantizer(qp: u32) -> u32 {
    2 + (f64::from(qp.min(51)) * 60.0 / 51.0).round() as u32
}

/// One point in a test's dimension space; applied to a base tuple.
pub trait Variant {
    fn apply(&self, tuple: &mut ParameterTuple);
}

/// Constant-quantizer dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CqpVariant {
    /// 0 = intra only (gop 1); anything else gets the default I/P cadence.
    pub ipmode: u32,
    pub qp: u32,
    pub quality: Option<u32>,
    pub slices: Option<u32>,
    pub refmode: Option<u32>,
    pub looplvl: Option<u32>,
    pub loopshp: Option<u32>,
    pub lowpower: bool,
}

impl Variant for CqpVariant {
    fn apply(&self, tuple: &mut ParameterTuple) {
        tuple.rc_mode = RateControl::Cqp;
        tuple.gop = Some(if self.ipmode != 0 { 30 } else { 1 });
        tuple.qp = Some(self.qp);
        if tuple.codec == "mpeg2" {
            tuple.mqp = Some(mpeg2_quantizer(self.qp));
        }
        tuple.quality = self.quality;
        tuple.slices = self.slices;
        tuple.refmode = self.refmode;
        tuple.looplvl = self.looplvl;
        tuple.loopshp = self.loopshp;
        tuple.lowpower = self.lowpower;
    }
}

/// Constant-bitrate dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CbrVariant {
    pub gop: u32,
    pub bitrate: u32,
    pub fps: u32,
    pub slices: Option<u32>,
    pub refmode: Option<u32>,
    pub looplvl: Option<u32>,
    pub loopshp: Option<u32>,
    pub lowpower: bool,
}

impl Variant for CbrVariant {
    fn apply(&self, tuple: &mut ParameterTuple) {
        tuple.rc_mode = RateControl::Cbr;
        tuple.gop = Some(self.gop);
        tuple.fps = Some(self.fps);
        tuple.bitrate = Some(self.bitrate);
        tuple.minrate = Some(self.bitrate);
        tuple.maxrate = Some(self.bitrate);
        tuple.slices = self.slices;
        tuple.refmode = self.refmode;
        tuple.looplvl = self.looplvl;
        tuple.loopshp = self.loopshp;
        tuple.lowpower = self.lowpower;
    }
}

/// Variable-bitrate dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VbrVariant {
    pub gop: u32,
    pub bitrate: u32,
    pub fps: u32,
    pub quality: Option<u32>,
    pub slices: Option<u32>,
    pub refmode: Option<u32>,
    pub looplvl: Option<u32>,
    pub loopshp: Option<u32>,
    pub lowpower: bool,
}

impl Variant for VbrVariant {
    fn apply(&self, tuple: &mut ParameterTuple) {
        tuple.rc_mode = RateControl::Vbr;
        tuple.gop = Some(self.gop);
        tuple.fps = Some(self.fps);
        tuple.bitrate = Some(self.bitrate);
        tuple.minrate = Some(self.bitrate);
        tuple.maxrate = Some(self.bitrate * VBR_MAXRATE_FACTOR);
        tuple.quality = self.quality;
        tuple.slices = self.slices;
        tuple.refmode = self.refmode;
        tuple.looplvl = self.looplvl;
        tuple.loopshp = self.loopshp;
        tuple.lowpower = self.lowpower;
    }
}

impl ParameterTuple {
    fn is_bitrate_controlled(&self) -> bool {
        matches!(self.rc_mode, RateControl::Cbr | RateControl::Vbr)
    }
}

/// Low-power pipeline variants accept but ignore some parameters. They stay
/// in the tuple (and the artifact name) as documented limitations.
fn log_lowpower_notices(tuple: &ParameterTuple) {
    if !tuple.lowpower {
        return;
    }
    if matches!(tuple.codec.as_str(), "vp8" | "vp9") {
        if tuple.quality.is_some() {
            warn!(case = %tuple.case, "'quality' parameter unused (not supported by plugin)");
        }
        if tuple.refmode.is_some() {
            warn!(case = %tuple.case, "'refmode' parameter unused (not supported by plugin)");
        }
    }
}

/// Expand (case, variant) combinations against a spec table.
///
/// Each combination shallow-copies the case's base record (the spec is never
/// mutated), applies the variant's overrides and constants, and — for
/// bitrate-controlled modes — swaps in the case's bitrate-test frame count
/// when one is present.
pub fn expand<'a, V, I>(
    spec: &TestSpec,
    codec: &str,
    mode: Mode,
    profile: &str,
    combos: I,
) -> Result<Vec<ParameterTuple>, HarnessError>
where
    V: Variant,
    I: IntoIterator<Item = (&'a str, V)>,
{
    let mut tuples = Vec::new();
    for (case, variant) in combos {
        let params = spec
            .get(case)
            .ok_or_else(|| HarnessError::InvalidSpec(format!("unknown case '{case}'")))?;
        let mut tuple = ParameterTuple::from_case(case, params, codec, mode, profile);
        variant.apply(&mut tuple);
        if tuple.is_bitrate_controlled() {
            tuple.frames = params.brframes.unwrap_or(params.frames);
        }
        log_lowpower_notices(&tuple);
        tuples.push(tuple);
    }
    Ok(tuples)
}

/// Cross product helper: every case against every variant, in spec order.
pub fn cross<'a, V: Variant + Copy>(
    cases: &[&'a str],
    variants: &[V],
) -> Vec<(&'a str, V)> {
    let mut combos = Vec::with_capacity(cases.len() * variants.len());
    for case in cases {
        for variant in variants {
            combos.push((*case, *variant));
        }
    }
    combos
}
