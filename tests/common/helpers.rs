#![allow(dead_code)] // Spare tools for the next regression sweep

use vacheck::engine::caps::{BackendProbe, Matrix, Mode};
use vacheck::engine::params::{CbrVariant, CqpVariant, OutputDescriptor, VbrVariant};
use vacheck::spec::TestSpec;

/// Probe with every backend element installed.
pub struct AllElements;

impl BackendProbe for AllElements {
    fn has_element(&self, _name: &str) -> bool {
        true
    }
}

/// Probe with only the software elements installed.
pub struct NoVaapi;

impl BackendProbe for NoVaapi {
    fn has_element(&self, name: &str) -> bool {
        !name.starts_with("vaapi")
    }
}

pub fn test_matrix() -> Matrix {
    Matrix::build(&AllElements)
}

/// Two-case spec covering the common shapes: an fps-less quality case and a
/// bitrate case with a bitrate-test frame count.
pub fn sample_spec() -> TestSpec {
    toml::from_str(
        r#"
        [city-352x288]
        source = "media/city-352x288.yuv"
        width = 352
        height = 288
        frames = 50

        [crowd-640x360]
        source = "media/crowd-640x360.yuv"
        width = 640
        height = 360
        frames = 100
        fps = 30
        brframes = 300
        bitrate = 5000
        "#,
    )
    .expect("sample spec parses")
}

pub fn cqp(ipmode: u32, qp: u32) -> CqpVariant {
    CqpVariant {
        ipmode,
        qp,
        quality: Some(4),
        slices: Some(1),
        refmode: None,
        looplvl: None,
        loopshp: None,
        lowpower: false,
    }
}

pub fn cbr(bitrate: u32, fps: u32) -> CbrVariant {
    CbrVariant {
        gop: 30,
        bitrate,
        fps,
        slices: Some(1),
        refmode: None,
        looplvl: None,
        loopshp: None,
        lowpower: false,
    }
}

pub fn vbr(bitrate: u32, fps: u32) -> VbrVariant {
    VbrVariant {
        gop: 30,
        bitrate,
        fps,
        quality: Some(4),
        slices: Some(1),
        refmode: None,
        looplvl: None,
        loopshp: None,
        lowpower: false,
    }
}

pub fn output(codec: &str, mode: Mode, channels: u32) -> OutputDescriptor {
    OutputDescriptor {
        codec: codec.to_string(),
        mode,
        width: None,
        height: None,
        channels,
    }
}

pub fn scaled_output(codec: &str, mode: Mode, width: u32, height: u32) -> OutputDescriptor {
    OutputDescriptor {
        codec: codec.to_string(),
        mode,
        width: Some(width),
        height: Some(height),
        channels: 1,
    }
}
