//! `gst-launch-1.0` command construction from typed stages.
//!
//! Builders here know pipeline topology (raw input chains, decode-back
//! chains, tee fan-out); the per-codec option policy stays in
//! `engine::options` and the per-key stage templates in `engine::caps`.

use std::path::{Path, PathBuf};

use super::stage::{Stage, StagePart};

pub const LAUNCHER: &str = "gst-launch-1.0 -vf";

/// Raw YUV dump sink used for reference comparison.
fn checksum_dump_part(location: &Path) -> StagePart {
    StagePart::element_with(
        "checksumsink2",
        vec![
            ("file-checksum".to_string(), "false".to_string()),
            ("qos".to_string(), "false".to_string()),
            ("frame-checksum".to_string(), "false".to_string()),
            ("plane-checksum".to_string(), "false".to_string()),
            ("dump-output".to_string(), "true".to_string()),
            ("dump-location".to_string(), location.display().to_string()),
        ],
    )
}

/// Raw-source input chain: filesrc, rawvideoparse with the mapped parse
/// token, then conversion to the caps format handed to the encoder.
pub struct RawInput<'a> {
    pub source: &'a Path,
    pub frames: u32,
    pub parse_format: &'a str,
    pub caps_format: &'a str,
    pub width: u32,
    pub height: u32,
    pub fps: Option<u32>,
}

impl RawInput<'_> {
    pub fn stage(&self) -> Stage {
        let mut parse_props = vec![
            ("format".to_string(), self.parse_format.to_string()),
            ("width".to_string(), self.width.to_string()),
            ("height".to_string(), self.height.to_string()),
        ];
        if let Some(fps) = self.fps {
            parse_props.push(("framerate".to_string(), fps.to_string()));
        }
        Stage::new(vec![
            StagePart::element_with(
                "filesrc",
                vec![
                    ("location".to_string(), self.source.display().to_string()),
                    ("num-buffers".to_string(), self.frames.to_string()),
                ],
            ),
            StagePart::element_with("rawvideoparse", parse_props),
            StagePart::element("videoconvert"),
            StagePart::Caps(format!("video/x-raw,format={}", self.caps_format)),
        ])
    }
}

fn join(stages: &[&Stage]) -> String {
    stages
        .iter()
        .map(|s| s.render())
        .collect::<Vec<_>>()
        .join(" ! ")
}

/// Single-stream encode: raw input → encoder stage → filesink.
pub fn encode_command(input: &RawInput<'_>, encoder: &Stage, encoded: &Path) -> String {
    let sink = Stage::new(vec![StagePart::element_with(
        "filesink",
        vec![("location".to_string(), encoded.display().to_string())],
    )]);
    format!("{LAUNCHER} {}", join(&[&input.stage(), encoder, &sink]))
}

/// Decode-back chain for metric comparison: encoded artifact → decoder →
/// optional scale back to reference dimensions → conversion to the
/// comparison format → YUV dump.
pub fn decode_command(
    encoded: &Path,
    decoder: &Stage,
    scale: Option<&Stage>,
    caps_format: &str,
    dump: &Path,
) -> String {
    let input = Stage::new(vec![StagePart::element_with(
        "filesrc",
        vec![("location".to_string(), encoded.display().to_string())],
    )]);
    let convert = Stage::new(vec![
        StagePart::element("videoconvert"),
        StagePart::Caps(format!("video/x-raw,format={caps_format}")),
        checksum_dump_part(dump),
    ]);
    let mut stages: Vec<&Stage> = vec![&input, decoder];
    if let Some(scale) = scale {
        stages.push(scale);
    }
    stages.push(&convert);
    format!("{LAUNCHER} {}", join(&stages))
}

/// One transcode fan-out branch, already instantiated: optional scale, the
/// encoder, and one sink per channel replication.
pub struct TranscodeBranch {
    pub scale: Option<Stage>,
    pub encoder: Stage,
    pub sinks: Vec<PathBuf>,
}

/// Transcode fan-out: decoded source feeding a tee, one queue/scale/encode
/// chain per output channel, plus a trailing branch dumping the decoded
/// source for reference comparison.
pub fn transcode_command(
    source: &Path,
    decoder: &Stage,
    branches: &[TranscodeBranch],
    source_dump: &Path,
) -> String {
    let mut opts = format!(
        "{LAUNCHER} filesrc location={} ! {} ! tee name=transcoder",
        source.display(),
        decoder.render()
    );

    for branch in branches {
        for sink in &branch.sinks {
            opts.push_str(" ! queue");
            if let Some(scale) = &branch.scale {
                opts.push_str(&format!(" ! {}", scale.render()));
            }
            opts.push_str(&format!(" ! {}", branch.encoder.render()));
            opts.push_str(&format!(
                " ! filesink location={} transcoder.",
                sink.display()
            ));
        }
    }

    // reference leg: decoded source to I420 for the metric probe
    opts.push_str(" ! queue ! videoconvert ! video/x-raw,format=I420");
    opts.push_str(&format!(" ! {}", checksum_dump_part(source_dump).render()));

    opts
}

/// Color-space conversion check: raw input → csc stage → YUV dump.
pub fn csc_command(input: &RawInput<'_>, csc: &Stage, dump: &Path) -> String {
    let sink = Stage::new(vec![checksum_dump_part(dump)]);
    format!("{LAUNCHER} {}", join(&[&input.stage(), csc, &sink]))
}
