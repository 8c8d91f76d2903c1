//! Encoder option assembly and artifact naming.
//!
//! Option order is load-bearing: artifact names derive from the same
//! presence-gated field walk, so two logically-identical cases collide to the
//! same name (deliberate, enables dedup) and different parameters never do.
//! Reordering either list breaks that.

use super::error::HarnessError;
use super::formats;
use super::params::ParameterTuple;
use super::stage::{Stage, StagePart};

/// Codec families that take their quantizer under a different property name.
fn is_vpx(codec: &str) -> bool {
    matches!(codec, "vp8" | "vp9")
}

fn is_jpeg(codec: &str) -> bool {
    matches!(codec, "jpeg" | "mjpeg")
}

/// Ordered (property, value) list for the encoder element.
///
/// Every present optional field contributes exactly one property, in a fixed
/// codec-aware order. Presence gates inclusion — a zero is still emitted.
pub fn encoder_options(t: &ParameterTuple) -> Result<Vec<(String, String)>, HarnessError> {
    let mut opts: Vec<(String, String)> = Vec::new();
    let mut push = |key: &str, value: String| opts.push((key.to_string(), value));

    if !is_jpeg(&t.codec) {
        push("rate-control", t.rc_mode.as_str().to_string());
    }
    if let Some(gop) = t.gop {
        push("keyframe-period", gop.to_string());
    }
    if let Some(qp) = t.qp {
        if is_vpx(&t.codec) {
            push("yac-qi", qp.to_string());
        } else if t.codec == "mpeg2" {
            let mqp = t.mqp.ok_or_else(|| {
                HarnessError::InvalidSpec(format!(
                    "case '{}': mpeg2 qp set without a mapped quantizer",
                    t.case
                ))
            })?;
            push("quantizer", mqp.to_string());
        } else {
            push("init-qp", qp.to_string());
        }
    }
    if let Some(quality) = t.quality {
        if is_jpeg(&t.codec) {
            push("quality", quality.to_string());
        } else {
            push("quality-level", quality.to_string());
        }
    }
    if let Some(slices) = t.slices {
        push("num-slices", slices.to_string());
    }
    if let Some(bframes) = t.bframes {
        push("max-bframes", bframes.to_string());
    }
    if let Some(maxrate) = t.maxrate {
        push("bitrate", maxrate.to_string());
    }
    if let Some(refmode) = t.refmode {
        push("ref-pic-mode", refmode.to_string());
    }
    if let Some(refs) = t.refs {
        push("refs", refs.to_string());
    }
    if t.lowpower {
        push("tune", "low-power".to_string());
    }
    if t.lowdelayb {
        push("low-delay-b", "1".to_string());
    }
    if let Some(loopshp) = t.loopshp {
        push("sharpness-level", loopshp.to_string());
    }
    if let Some(looplvl) = t.looplvl {
        push("loop-filter-level", looplvl.to_string());
    }

    Ok(opts)
}

/// Deterministic artifact base name for a tuple. Same presence-gated walk as
/// the option list, prefixed with case, rate-control mode and profile.
pub fn artifact_name(t: &ParameterTuple) -> String {
    let mut name = format!("{}-{}-{}", t.case, t.rc_mode, t.profile);
    if let Some(fps) = t.fps {
        name.push_str(&format!("-{fps}"));
    }
    if let Some(gop) = t.gop {
        name.push_str(&format!("-{gop}"));
    }
    if let Some(qp) = t.qp {
        name.push_str(&format!("-{qp}"));
    }
    if let Some(slices) = t.slices {
        name.push_str(&format!("-{slices}"));
    }
    if let Some(quality) = t.quality {
        name.push_str(&format!("-{quality}"));
    }
    if let Some(bframes) = t.bframes {
        name.push_str(&format!("-{bframes}"));
    }
    if let Some(minrate) = t.minrate {
        name.push_str(&format!("-{minrate}k"));
    }
    if let Some(maxrate) = t.maxrate {
        name.push_str(&format!("-{maxrate}k"));
    }
    if let Some(refmode) = t.refmode {
        name.push_str(&format!("-{refmode}"));
    }
    if let Some(refs) = t.refs {
        name.push_str(&format!("-{refs}"));
    }
    if t.lowpower {
        name.push_str("-low-power");
    }
    if let Some(loopshp) = t.loopshp {
        name.push_str(&format!("-{loopshp}"));
    }
    if let Some(looplvl) = t.looplvl {
        name.push_str(&format!("-{looplvl}"));
    }
    name
}

/// Full encoder stage: the encoder element with its ordered options, the
/// profile capsfilter where the codec carries one, and the bitstream parser.
pub fn encoder_stage(
    factory: &str,
    t: &ParameterTuple,
    mapped_profile: Option<&str>,
) -> Result<Stage, HarnessError> {
    let mut parts = vec![StagePart::Element {
        factory: factory.to_string(),
        props: encoder_options(t)?,
    }];

    // vpx and mpeg2 bitstreams carry no profile caps; jpeg is quality-only.
    if !matches!(t.codec.as_str(), "jpeg" | "mjpeg" | "mpeg2" | "vp8" | "vp9") {
        if let (Some(media), Some(profile)) = (formats::media_type(&t.codec), mapped_profile) {
            parts.push(StagePart::Caps(format!("{media},profile={profile}")));
        }
    }
    if let Some(parser) = formats::parser(&t.codec) {
        parts.push(StagePart::element(parser));
    }

    Ok(Stage::new(parts))
}
