//! Pixel-format, profile, and color-space token mapping for the GStreamer
//! backend.
//!
//! Pure lookups with no side effects. `None` means the backend has no
//! equivalent token; callers must treat that as "skip this case", never as a
//! fatal error.

/// `rawvideoparse` format token (lowercase enum nick) for a spec-level pixel
/// format.
pub fn map_format(format: &str) -> Option<&'static str> {
    match format {
        "I420" => Some("i420"),
        "NV12" => Some("nv12"),
        "YV12" => Some("yv12"),
        "AYUV" => Some("ayuv"),
        "YUY2" => Some("yuy2"),
        "UYVY" => Some("uyvy"),
        "P010" => Some("p010-10le"),
        "ARGB" => Some("argb"),
        "BGRA" => Some("bgra"),
        "Y800" => Some("gray8"),
        _ => None,
    }
}

/// `video/x-raw` caps format token for a spec-level pixel format. Used after
/// `videoconvert` when handing frames to the hardware encoder, and when
/// dumping decoded output for comparison.
pub fn map_format_caps(format: &str) -> Option<&'static str> {
    match format {
        "I420" => Some("I420"),
        "NV12" => Some("NV12"),
        "YV12" => Some("YV12"),
        "AYUV" => Some("AYUV"),
        "YUY2" => Some("YUY2"),
        "UYVY" => Some("UYVY"),
        "P010" => Some("P010_10LE"),
        "ARGB" => Some("ARGB"),
        "BGRA" => Some("BGRA"),
        "Y800" => Some("GRAY8"),
        _ => None,
    }
}

/// Caps token for a color-space-conversion target. The vpp csc path only
/// supports a subset of the raw formats.
pub fn map_csc(target: &str) -> Option<&'static str> {
    match target {
        "I420" | "NV12" | "YV12" | "AYUV" | "YUY2" | "UYVY" | "P010" | "ARGB" | "BGRA" => {
            map_format_caps(target)
        }
        _ => None,
    }
}

/// Backend profile token for a (codec, profile) pair.
pub fn map_profile(codec: &str, profile: &str) -> Option<&'static str> {
    match (codec, profile) {
        ("avc", "baseline") => Some("constrained-baseline"),
        ("avc", "main") => Some("main"),
        ("avc", "high") => Some("high"),
        ("hevc" | "hevc-8", "main") => Some("main"),
        ("mpeg2", "simple") => Some("simple"),
        ("mpeg2", "main") => Some("main"),
        ("jpeg", "baseline") => Some("baseline"),
        ("vp8", "version0_3") => Some("0"),
        ("vp9", "profile0") => Some("0"),
        ("vp9", "profile2") => Some("2"),
        _ => None,
    }
}

/// Container/bitstream file extension for an encoded artifact.
pub fn file_ext(codec: &str) -> Option<&'static str> {
    match codec {
        "avc" => Some("h264"),
        "hevc" | "hevc-8" => Some("h265"),
        "mpeg2" => Some("m2v"),
        "mjpeg" => Some("mjpeg"),
        "jpeg" => Some("jpg"),
        "vp8" | "vp9" => Some("ivf"),
        _ => None,
    }
}

/// Encoded media type for the profile capsfilter.
pub fn media_type(codec: &str) -> Option<&'static str> {
    match codec {
        "avc" => Some("video/x-h264"),
        "hevc" | "hevc-8" => Some("video/x-h265"),
        "mpeg2" => Some("video/mpeg"),
        "vp8" => Some("video/x-vp8"),
        "vp9" => Some("video/x-vp9"),
        "jpeg" | "mjpeg" => Some("image/jpeg"),
        _ => None,
    }
}

/// Bitstream parser element placed after the encoder, where one exists.
pub fn parser(codec: &str) -> Option<&'static str> {
    match codec {
        "avc" => Some("h264parse"),
        "hevc" | "hevc-8" => Some("h265parse"),
        "mpeg2" => Some("mpegvideoparse"),
        "jpeg" | "mjpeg" => Some("jpegparse"),
        _ => None,
    }
}
