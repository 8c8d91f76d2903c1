// Integration tests for pipeline command generation from spec expansion
//
// These tests verify that spec cases and dimension variants translate to the
// expected gst-launch command lines end to end.

use tempfile::tempdir;

use vacheck::engine::artifacts::ArtifactStore;
use vacheck::engine::caps::Mode;
use vacheck::engine::params::{RateControl, expand};
use vacheck::runner::render_encode_command;

use crate::common::assertions::*;
use crate::common::helpers::*;

fn render_one(codec: &str, profile: &str, variant: vacheck::engine::params::CqpVariant) -> String {
    let spec = sample_spec();
    let matrix = test_matrix();
    let dir = tempdir().unwrap();
    let artifacts = ArtifactStore::new(dir.path().join("artifacts")).unwrap();
    let tuples = expand(
        &spec,
        codec,
        Mode::Hw,
        profile,
        vec![("city-352x288", variant)],
    )
    .unwrap();
    render_encode_command(&matrix, &tuples[0], &artifacts)
        .unwrap()
        .expect("command should render")
}

// ============================================================================
// Codec-aware option naming
// ============================================================================

#[test]
fn test_avc_cqp_command_shape() {
    let cmd = render_one("avc", "main", cqp(1, 28));

    assert_cmd_contains(&cmd, "gst-launch-1.0 -vf filesrc location=media/city-352x288.yuv");
    assert_cmd_contains(&cmd, "num-buffers=50");
    assert_cmd_contains(&cmd, "rawvideoparse format=i420 width=352 height=288");
    assert_cmd_contains(&cmd, "vaapih264enc rate-control=cqp keyframe-period=30 init-qp=28");
    assert_cmd_contains(&cmd, "video/x-h264,profile=main ! h264parse");
    assert_cmd_contains(&cmd, "city-352x288-cqp-main-30-28-1-4.h264");
}

#[test]
fn test_vp9_uses_yac_qi_in_command() {
    let cmd = render_one("vp9", "profile0", cqp(1, 28));

    assert_cmd_contains(&cmd, "vaapivp9enc");
    assert_cmd_contains(&cmd, "yac-qi=28");
    assert_cmd_not_contains(&cmd, "init-qp");
    // vp9 bitstreams carry no profile caps
    assert_cmd_not_contains(&cmd, "video/x-vp9,profile");
}

#[test]
fn test_mpeg2_binds_quantizer_not_qp() {
    let cmd = render_one("mpeg2", "main", cqp(1, 28));

    assert_cmd_contains(&cmd, "vaapimpeg2enc");
    assert_cmd_contains(&cmd, "quantizer=");
    assert_cmd_not_contains(&cmd, "init-qp");
    assert_cmd_not_contains(&cmd, "yac-qi");
}

#[test]
fn test_intra_only_gop_is_one() {
    let cmd = render_one("avc", "main", cqp(0, 14));
    assert_cmd_contains(&cmd, "keyframe-period=1");
}

// ============================================================================
// Bitrate-controlled expansion
// ============================================================================

#[test]
fn test_cbr_command_pins_bitrate_and_framerate() {
    let spec = sample_spec();
    let matrix = test_matrix();
    let dir = tempdir().unwrap();
    let artifacts = ArtifactStore::new(dir.path().join("artifacts")).unwrap();

    let tuples = expand(
        &spec,
        "avc",
        Mode::Hw,
        "main",
        vec![("crowd-640x360", cbr(5000, 30))],
    )
    .unwrap();
    let t = &tuples[0];
    assert_eq!(t.rc_mode, RateControl::Cbr);
    // the bitrate-test frame count takes over
    assert_eq!(t.frames, 300);

    let cmd = render_encode_command(&matrix, t, &artifacts)
        .unwrap()
        .unwrap();
    assert_cmd_contains(&cmd, "num-buffers=300");
    assert_cmd_contains(&cmd, "framerate=30");
    assert_cmd_contains(&cmd, "rate-control=cbr");
    assert_cmd_contains(&cmd, "bitrate=5000");
    // minrate/maxrate both land in the artifact name
    assert_cmd_contains(&cmd, "-5000k-5000k");
}

#[test]
fn test_vbr_maxrate_cap_lands_in_command() {
    let spec = sample_spec();
    let matrix = test_matrix();
    let dir = tempdir().unwrap();
    let artifacts = ArtifactStore::new(dir.path().join("artifacts")).unwrap();

    let tuples = expand(
        &spec,
        "avc",
        Mode::Hw,
        "main",
        vec![("crowd-640x360", vbr(2500, 30))],
    )
    .unwrap();
    let cmd = render_encode_command(&matrix, &tuples[0], &artifacts)
        .unwrap()
        .unwrap();
    // the encoder's cap is the doubled maxrate, not the target
    assert_cmd_contains(&cmd, "rate-control=vbr");
    assert_cmd_contains(&cmd, "bitrate=5000");
    assert_cmd_contains(&cmd, "-2500k-5000k");
}

// ============================================================================
// Mapping gaps skip instead of failing
// ============================================================================

#[test]
fn test_unmapped_profile_renders_nothing() {
    let spec = sample_spec();
    let matrix = test_matrix();
    let dir = tempdir().unwrap();
    let artifacts = ArtifactStore::new(dir.path().join("artifacts")).unwrap();

    let tuples = expand(
        &spec,
        "avc",
        Mode::Hw,
        "high444",
        vec![("city-352x288", cqp(1, 28))],
    )
    .unwrap();
    let rendered = render_encode_command(&matrix, &tuples[0], &artifacts).unwrap();
    assert!(rendered.is_none(), "unmapped profile must skip, not error");
}
