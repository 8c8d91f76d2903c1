//! Capability and platform resolution.
//!
//! The requirement matrix maps a composite (operation, codec, mode) key to
//! the supporting platform set, an element-availability requirement, and the
//! pipeline-stage template. It is built once at startup; codec aliases are
//! expanded by copy at build time so lookup stays a pure mapping.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::process::Command;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::HarnessError;
use super::stage::{Stage, StageTemplate, TemplatePart};

// ============================================================================
// Platform tags
// ============================================================================

pub const ALL_PLATFORMS: &[&str] = &[
    "BDW", "BSW", "SKL", "APL", "KBL", "GLK", "CFL", "ICL", "EHL", "JSL", "TGL", "DG1", "DG2",
    "ADLS", "ADLP",
];

const GEN9_PLUS: &[&str] = &[
    "SKL", "APL", "KBL", "GLK", "CFL", "ICL", "EHL", "JSL", "TGL", "DG1", "DG2", "ADLS", "ADLP",
];

const GEN11_PLUS: &[&str] = &["ICL", "EHL", "JSL", "TGL", "DG1", "DG2", "ADLS", "ADLP"];

const GEN12_PLUS: &[&str] = &["TGL", "DG1", "DG2", "ADLS", "ADLP"];

pub const AVC_DECODE_PLATFORMS: &[&str] = ALL_PLATFORMS;
pub const AVC_ENCODE_PLATFORMS: &[&str] = ALL_PLATFORMS;
pub const HEVC_DECODE_8BIT_PLATFORMS: &[&str] = &[
    "BSW", "SKL", "APL", "KBL", "GLK", "CFL", "ICL", "EHL", "JSL", "TGL", "DG1", "DG2", "ADLS",
    "ADLP",
];
pub const HEVC_ENCODE_8BIT_PLATFORMS: &[&str] = GEN9_PLUS;
pub const MPEG2_DECODE_PLATFORMS: &[&str] = ALL_PLATFORMS;
pub const MPEG2_ENCODE_PLATFORMS: &[&str] =
    &["BDW", "SKL", "KBL", "CFL", "ICL", "TGL", "ADLS", "ADLP"];
pub const JPEG_DECODE_PLATFORMS: &[&str] = ALL_PLATFORMS;
pub const JPEG_ENCODE_PLATFORMS: &[&str] = &[
    "BSW", "SKL", "APL", "KBL", "GLK", "CFL", "ICL", "EHL", "JSL", "TGL", "DG1", "DG2", "ADLS",
    "ADLP",
];
pub const VC1_DECODE_PLATFORMS: &[&str] = &["BDW", "BSW", "SKL", "KBL", "CFL", "ICL", "TGL"];
pub const VP9_DECODE_PLATFORMS: &[&str] = &[
    "BSW", "KBL", "GLK", "CFL", "ICL", "EHL", "JSL", "TGL", "DG1", "DG2", "ADLS", "ADLP",
];
pub const VP9_ENCODE_PLATFORMS: &[&str] = GEN11_PLUS;
pub const VPP_PLATFORMS: &[&str] = ALL_PLATFORMS;

/// Low-power (VDENC) capability table, keyed by feature-family codec tag.
pub fn platform_capabilities(feature: &str, codec: &str) -> Option<&'static [&'static str]> {
    match (feature, codec) {
        ("vdenc", "avc") => Some(GEN9_PLUS),
        ("vdenc", "hevc_8") => Some(GEN11_PLUS),
        ("vdenc", "vp9_8") => Some(GEN11_PLUS),
        ("vdenc", "vp9_10") => Some(GEN12_PLUS),
        _ => None,
    }
}

/// Requirement for a low-power capability on the machine under test.
/// `platform` is the tag of the platform the harness is running on, when
/// identified; an unidentified platform cannot satisfy a vdenc requirement.
pub fn have_caps(feature: &str, codec: &str, platform: Option<&str>) -> Requirement {
    let supported = platform_capabilities(feature, codec);
    let satisfied = match (supported, platform) {
        (Some(platforms), Some(tag)) => platforms.contains(&tag),
        _ => false,
    };
    Requirement {
        satisfied,
        diagnostic: format!("{feature}:{codec} capability"),
    }
}

// ============================================================================
// Matrix keys
// ============================================================================

/// Pipeline operation the matrix is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Op {
    Decode,
    Encode,
    Vpp,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Decode => write!(f, "decode"),
            Op::Encode => write!(f, "encode"),
            Op::Vpp => write!(f, "vpp"),
        }
    }
}

/// Software or hardware execution of a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Sw,
    Hw,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Sw => write!(f, "sw"),
            Mode::Hw => write!(f, "hw"),
        }
    }
}

// ============================================================================
// Requirements
// ============================================================================

/// Outcome of a single requirement check: satisfied or not, plus the
/// diagnostic surfaced when a case is skipped for unmet requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub satisfied: bool,
    pub diagnostic: String,
}

/// One capability-matrix entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementEntry {
    pub platforms: BTreeSet<String>,
    pub requirement: Requirement,
    pub template: Option<StageTemplate>,
}

impl RequirementEntry {
    /// Sentinel for a key absent from the matrix: empty platform set, a
    /// failing requirement carrying the literal triple, no template.
    pub fn missing(op: Op, codec: &str, mode: Mode) -> Self {
        RequirementEntry {
            platforms: BTreeSet::new(),
            requirement: Requirement {
                satisfied: false,
                diagnostic: format!("{op}:{codec}:{mode}"),
            },
            template: None,
        }
    }
}

// ============================================================================
// Backend probing
// ============================================================================

/// Element-availability probe for the GStreamer backend.
pub trait BackendProbe {
    fn has_element(&self, name: &str) -> bool;
}

/// Cache for the output of `gst-inspect-1.0` (full plugin inventory).
static GST_INVENTORY_CACHE: OnceLock<String> = OnceLock::new();

fn gst_inventory() -> &'static str {
    GST_INVENTORY_CACHE.get_or_init(|| {
        Command::new("gst-inspect-1.0")
            .output()
            .ok()
            .map(|o| String::from_utf8_lossy(&o.stdout).to_string())
            .unwrap_or_default()
    })
}

/// Probes the installed GStreamer registry once and answers from the cached
/// inventory afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct GstInspectProbe;

impl BackendProbe for GstInspectProbe {
    fn has_element(&self, name: &str) -> bool {
        gst_inventory().contains(name)
    }
}

/// Probe that reports every element as available. Used for dry runs, where
/// the pipeline is rendered but never executed.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeAvailable;

impl BackendProbe for AssumeAvailable {
    fn has_element(&self, _name: &str) -> bool {
        true
    }
}

// ============================================================================
// Matrix
// ============================================================================

struct MatrixRow {
    op: Op,
    codec: &'static str,
    mode: Mode,
    platforms: &'static [&'static str],
    element: &'static str,
    template: &'static [TemplatePart],
}

use TemplatePart::{Caps, Element};

const VC1_SRC_CAPS: &str =
    "'video/x-wmv,profile=(string)advanced',width={width},height={height},framerate=14/1";

#[rustfmt::skip]
const MATRIX_ROWS: &[MatrixRow] = &[
    // decode
    MatrixRow { op: Op::Decode, codec: "avc", mode: Mode::Sw, platforms: ALL_PLATFORMS, element: "avdec_h264", template: &[Element("h264parse"), Element("avdec_h264")] },
    MatrixRow { op: Op::Decode, codec: "avc", mode: Mode::Hw, platforms: AVC_DECODE_PLATFORMS, element: "vaapih264dec", template: &[Element("h264parse"), Element("vaapih264dec")] },
    MatrixRow { op: Op::Decode, codec: "hevc-8", mode: Mode::Sw, platforms: ALL_PLATFORMS, element: "avdec_h265", template: &[Element("h265parse"), Element("avdec_h265")] },
    MatrixRow { op: Op::Decode, codec: "hevc-8", mode: Mode::Hw, platforms: HEVC_DECODE_8BIT_PLATFORMS, element: "vaapih265dec", template: &[Element("h265parse"), Element("vaapih265dec")] },
    MatrixRow { op: Op::Decode, codec: "mpeg2", mode: Mode::Sw, platforms: ALL_PLATFORMS, element: "avdec_mpeg2video", template: &[Element("mpegvideoparse"), Element("avdec_mpeg2video")] },
    MatrixRow { op: Op::Decode, codec: "mpeg2", mode: Mode::Hw, platforms: MPEG2_DECODE_PLATFORMS, element: "vaapimpeg2dec", template: &[Element("mpegvideoparse"), Element("vaapimpeg2dec")] },
    MatrixRow { op: Op::Decode, codec: "mjpeg", mode: Mode::Sw, platforms: ALL_PLATFORMS, element: "jpegdec", template: &[Element("jpegparse"), Element("jpegdec")] },
    MatrixRow { op: Op::Decode, codec: "mjpeg", mode: Mode::Hw, platforms: JPEG_DECODE_PLATFORMS, element: "vaapijpegdec", template: &[Element("jpegparse"), Element("vaapijpegdec")] },
    MatrixRow { op: Op::Decode, codec: "vc1", mode: Mode::Sw, platforms: ALL_PLATFORMS, element: "avdec_vc1", template: &[Caps(VC1_SRC_CAPS), Element("avdec_vc1")] },
    MatrixRow { op: Op::Decode, codec: "vc1", mode: Mode::Hw, platforms: VC1_DECODE_PLATFORMS, element: "vaapivc1dec", template: &[Caps(VC1_SRC_CAPS), Element("vaapivc1dec")] },
    MatrixRow { op: Op::Decode, codec: "vp9", mode: Mode::Sw, platforms: ALL_PLATFORMS, element: "vp9dec", template: &[Element("ivfparse"), Element("vp9dec")] },
    MatrixRow { op: Op::Decode, codec: "vp9", mode: Mode::Hw, platforms: VP9_DECODE_PLATFORMS, element: "vaapivp9dec", template: &[Element("ivfparse"), Element("vaapivp9dec")] },
    // encode
    MatrixRow { op: Op::Encode, codec: "avc", mode: Mode::Sw, platforms: ALL_PLATFORMS, element: "x264enc", template: &[Element("x264enc"), Caps("video/x-h264,profile=main"), Element("h264parse")] },
    MatrixRow { op: Op::Encode, codec: "avc", mode: Mode::Hw, platforms: AVC_ENCODE_PLATFORMS, element: "vaapih264enc", template: &[Element("vaapih264enc"), Caps("video/x-h264,profile=main"), Element("h264parse")] },
    MatrixRow { op: Op::Encode, codec: "hevc-8", mode: Mode::Sw, platforms: ALL_PLATFORMS, element: "x265enc", template: &[Element("x265enc"), Caps("video/x-h265,profile=main"), Element("h265parse")] },
    MatrixRow { op: Op::Encode, codec: "hevc-8", mode: Mode::Hw, platforms: HEVC_ENCODE_8BIT_PLATFORMS, element: "vaapih265enc", template: &[Element("vaapih265enc"), Caps("video/x-h265,profile=main"), Element("h265parse")] },
    MatrixRow { op: Op::Encode, codec: "mpeg2", mode: Mode::Sw, platforms: ALL_PLATFORMS, element: "avenc_mpeg2video", template: &[Element("avenc_mpeg2video"), Element("mpegvideoparse")] },
    MatrixRow { op: Op::Encode, codec: "mpeg2", mode: Mode::Hw, platforms: MPEG2_ENCODE_PLATFORMS, element: "vaapimpeg2enc", template: &[Element("vaapimpeg2enc"), Element("mpegvideoparse")] },
    MatrixRow { op: Op::Encode, codec: "mjpeg", mode: Mode::Sw, platforms: ALL_PLATFORMS, element: "jpegenc", template: &[Element("jpegenc"), Element("jpegparse")] },
    MatrixRow { op: Op::Encode, codec: "mjpeg", mode: Mode::Hw, platforms: JPEG_ENCODE_PLATFORMS, element: "vaapijpegenc", template: &[Element("vaapijpegenc"), Element("jpegparse")] },
    MatrixRow { op: Op::Encode, codec: "vp9", mode: Mode::Sw, platforms: ALL_PLATFORMS, element: "vp9enc", template: &[Element("vp9enc")] },
    MatrixRow { op: Op::Encode, codec: "vp9", mode: Mode::Hw, platforms: VP9_ENCODE_PLATFORMS, element: "vaapivp9enc", template: &[Element("vaapivp9enc")] },
    // vpp
    MatrixRow { op: Op::Vpp, codec: "scale", mode: Mode::Sw, platforms: ALL_PLATFORMS, element: "videoscale", template: &[Element("videoscale"), Caps("video/x-raw,width={width},height={height}")] },
    MatrixRow { op: Op::Vpp, codec: "scale", mode: Mode::Hw, platforms: VPP_PLATFORMS, element: "vaapipostproc", template: &[Element("vaapipostproc"), Caps("video/x-raw,width={width},height={height}")] },
    MatrixRow { op: Op::Vpp, codec: "csc", mode: Mode::Sw, platforms: ALL_PLATFORMS, element: "videoconvert", template: &[Element("videoconvert"), Caps("video/x-raw,format={format}")] },
    MatrixRow { op: Op::Vpp, codec: "csc", mode: Mode::Hw, platforms: VPP_PLATFORMS, element: "vaapipostproc", template: &[Element("vaapipostproc"), Caps("video/x-raw,format={format}")] },
];

/// Codec aliases expanded at matrix build time: the generic name stands in
/// for its default bit-depth variant.
const CODEC_ALIASES: &[(Op, &str, &str)] = &[
    (Op::Decode, "hevc", "hevc-8"),
    (Op::Encode, "hevc", "hevc-8"),
];

/// The capability matrix: process-wide static configuration, built once.
#[derive(Debug, Clone)]
pub struct Matrix {
    entries: BTreeMap<(Op, String, Mode), RequirementEntry>,
}

impl Matrix {
    /// Build the matrix from the static table, probing element availability
    /// through `probe` and expanding codec aliases by copy.
    pub fn build(probe: &dyn BackendProbe) -> Self {
        let mut entries = BTreeMap::new();
        for row in MATRIX_ROWS {
            let entry = RequirementEntry {
                platforms: row.platforms.iter().map(|p| p.to_string()).collect(),
                requirement: Requirement {
                    satisfied: probe.has_element(row.element),
                    diagnostic: format!("gst element '{}'", row.element),
                },
                template: Some(StageTemplate::new(row.template)),
            };
            entries.insert((row.op, row.codec.to_string(), row.mode), entry);
        }

        for (op, alias, target) in CODEC_ALIASES {
            for mode in [Mode::Sw, Mode::Hw] {
                if let Some(entry) = entries.get(&(*op, target.to_string(), mode)) {
                    let copy = entry.clone();
                    debug!("expanding codec alias {op}:{alias}:{mode} -> {op}:{target}:{mode}");
                    entries.insert((*op, alias.to_string(), mode), copy);
                }
            }
        }

        Matrix { entries }
    }

    /// Pure lookup; `None` for keys the matrix does not know.
    pub fn lookup(&self, op: Op, codec: &str, mode: Mode) -> Option<&RequirementEntry> {
        self.entries.get(&(op, codec.to_string(), mode))
    }

    /// Lookup that synthesizes the missing-entry sentinel so callers always
    /// get platforms + requirement + template back.
    pub fn resolve(&self, op: Op, codec: &str, mode: Mode) -> RequirementEntry {
        self.lookup(op, codec, mode)
            .cloned()
            .unwrap_or_else(|| RequirementEntry::missing(op, codec, mode))
    }

    /// Stage template for a key; a miss here is a specification error and
    /// fails fast with the literal triple.
    pub fn template(&self, op: Op, codec: &str, mode: Mode) -> Result<StageTemplate, HarnessError> {
        self.lookup(op, codec, mode)
            .and_then(|e| e.template)
            .ok_or_else(|| HarnessError::MissingCapability(format!("{op}:{codec}:{mode}")))
    }

    /// Instantiated decode stage for an encoded stream of `codec`.
    pub fn decoder_stage(
        &self,
        codec: &str,
        mode: Mode,
        width: u32,
        height: u32,
    ) -> Result<Stage, HarnessError> {
        Ok(self
            .template(Op::Decode, codec, mode)?
            .instantiate_dims(width, height))
    }

    /// Instantiated scale stage. `None` when neither dimension is overridden.
    pub fn scale_stage(
        &self,
        width: Option<u32>,
        height: Option<u32>,
        mode: Mode,
        default_width: u32,
        default_height: u32,
    ) -> Result<Option<Stage>, HarnessError> {
        if width.is_none() && height.is_none() {
            return Ok(None);
        }
        let template = self.template(Op::Vpp, "scale", mode)?;
        Ok(Some(template.instantiate_dims(
            width.unwrap_or(default_width),
            height.unwrap_or(default_height),
        )))
    }
}
