// Transcode fan-out: platform intersection, requirement collection, and
// tee-based pipeline construction.

use std::path::{Path, PathBuf};

use vacheck::engine::caps::{Matrix, Mode, Op};
use vacheck::engine::decision::{Verdict, transcode_verdict};
use vacheck::engine::params::{OutputDescriptor, ParameterTuple, RateControl};
use vacheck::engine::pipeline::{TranscodeBranch, transcode_command};

use crate::common::assertions::*;
use crate::common::helpers::*;

fn transcode_tuple(codec: &str, outputs: Vec<OutputDescriptor>) -> ParameterTuple {
    ParameterTuple {
        case: "fullhd".to_string(),
        codec: codec.to_string(),
        mode: Mode::Hw,
        profile: "main".to_string(),
        rc_mode: RateControl::Cqp,
        source: PathBuf::from("media/fullhd.h264"),
        width: 1920,
        height: 1080,
        frames: 50,
        format: "I420".to_string(),
        reference: None,
        metric: None,
        call_timeout: None,
        fps: None,
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
        outputs,
    }
}

#[test]
fn test_two_branch_fanout_runs_when_everything_intersects() {
    let matrix = test_matrix();
    let t = transcode_tuple(
        "avc",
        vec![output("hevc-8", Mode::Hw, 1), output("mjpeg", Mode::Hw, 1)],
    );
    assert_eq!(transcode_verdict(&matrix, &t, &[]).unwrap(), Verdict::Run);
}

#[test]
fn test_scale_branch_intersects_vpp_platforms() {
    let matrix = test_matrix();
    let t = transcode_tuple("avc", vec![scaled_output("avc", Mode::Hw, 640, 360)]);
    assert_eq!(transcode_verdict(&matrix, &t, &[]).unwrap(), Verdict::Run);
}

#[test]
fn test_platform_filter_vs_intersection() {
    let matrix = test_matrix();
    // vc1 decode support ends at TGL, so DG2 cannot be in the intersection
    let t = transcode_tuple("vc1", vec![output("avc", Mode::Hw, 1)]);
    assert_eq!(
        transcode_verdict(&matrix, &t, &["DG2".to_string()]).unwrap(),
        Verdict::Skip("unsupported platform".to_string())
    );
    assert_eq!(
        transcode_verdict(&matrix, &t, &["TGL".to_string()]).unwrap(),
        Verdict::Run
    );
}

#[test]
fn test_missing_encode_entry_is_fatal_with_triple() {
    let matrix = test_matrix();
    let t = transcode_tuple("avc", vec![output("av1", Mode::Hw, 1)]);
    let err = transcode_verdict(&matrix, &t, &[]).unwrap_err();
    assert!(
        err.to_string().contains("encode:av1:hw"),
        "diagnostic must carry the literal triple: {err}"
    );
}

#[test]
fn test_unmet_hw_requirements_all_reported() {
    let matrix = Matrix::build(&NoVaapi);
    let t = transcode_tuple(
        "avc",
        vec![output("hevc-8", Mode::Hw, 1), output("mjpeg", Mode::Hw, 1)],
    );
    match transcode_verdict(&matrix, &t, &[]).unwrap() {
        Verdict::Skip(reason) => {
            assert!(reason.contains("One or more software requirements not met"));
            assert!(reason.contains("vaapih264dec"));
            assert!(reason.contains("vaapih265enc"));
            assert!(reason.contains("vaapijpegenc"));
        }
        other => panic!("expected skip, got {other:?}"),
    }
}

#[test]
fn test_tee_command_replicates_channels_and_scales() {
    let matrix = test_matrix();
    let decoder = matrix.decoder_stage("avc", Mode::Hw, 1920, 1080).unwrap();
    let scale = matrix
        .scale_stage(Some(640), Some(360), Mode::Hw, 1920, 1080)
        .unwrap();
    let encoder = matrix
        .template(Op::Encode, "hevc-8", Mode::Hw)
        .unwrap()
        .instantiate_dims(1920, 1080);

    let branches = vec![
        TranscodeBranch {
            scale: None,
            encoder: encoder.clone(),
            sinks: vec![
                PathBuf::from("out/fullhd_0_0.h265"),
                PathBuf::from("out/fullhd_0_1.h265"),
            ],
        },
        TranscodeBranch {
            scale,
            encoder,
            sinks: vec![PathBuf::from("out/fullhd_1_0.h265")],
        },
    ];
    let cmd = transcode_command(
        Path::new("media/fullhd.h264"),
        &decoder,
        &branches,
        Path::new("out/src_fullhd.yuv"),
    );

    assert_cmd_contains(&cmd, "h264parse ! vaapih264dec ! tee name=transcoder");
    assert_eq!(
        cmd.matches("filesink location=").count(),
        3,
        "one sink per channel"
    );
    assert_cmd_contains(&cmd, "vaapipostproc ! video/x-raw,width=640,height=360");
    // reference leg dumps the decoded source for the metric probe
    assert_cmd_contains(&cmd, "video/x-raw,format=I420");
    assert_cmd_contains(&cmd, "dump-location=out/src_fullhd.yuv");
    // every fan-out chain hangs off the named tee
    assert_eq!(cmd.matches("transcoder.").count(), 3);
}
