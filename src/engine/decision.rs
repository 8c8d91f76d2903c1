//! Execute-vs-skip decisions.
//!
//! A decision is a typed verdict, not control flow: the driver translates
//! `Skip` into whatever the surrounding runner reports, and a fatal
//! specification error comes back as `Err`. Terminal either way — a skip is
//! never revisited within an invocation.

use std::collections::BTreeSet;

use super::caps::{ALL_PLATFORMS, Matrix, Mode, Op, Requirement, RequirementEntry, have_caps};
use super::error::HarnessError;
use super::params::ParameterTuple;

/// Terminal decision for one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Run,
    Skip(String),
}

// ============================================================================
// Platform filters
// ============================================================================

/// Case-insensitive `*`-wildcard match.
fn wildcard_match(pattern: &str, value: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let value = value.to_ascii_lowercase();

    let mut segments = pattern.split('*');
    let first = segments.next().unwrap_or("");
    if !pattern.contains('*') {
        return pattern == value;
    }

    let mut rest = match value.strip_prefix(first) {
        Some(rest) => rest,
        None => return false,
    };
    let mut last_segment: Option<&str> = None;
    for segment in segments {
        if segment.is_empty() {
            last_segment = Some(segment);
            continue;
        }
        match rest.find(segment) {
            Some(at) => rest = &rest[at + segment.len()..],
            None => return false,
        }
        last_segment = Some(segment);
    }
    // a trailing non-empty segment must anchor at the end
    match last_segment {
        Some("") | None => true,
        Some(segment) => rest.is_empty() || value.ends_with(segment),
    }
}

/// Command-line platform filters, matched against platform tags.
#[derive(Debug, Clone, Default)]
pub struct PlatformMatcher {
    patterns: Vec<String>,
}

impl PlatformMatcher {
    pub fn new(filters: &[String]) -> Self {
        PlatformMatcher {
            patterns: filters.to_vec(),
        }
    }

    pub fn matches(&self, tag: &str) -> bool {
        self.patterns.iter().any(|p| wildcard_match(p, tag))
    }

    /// True when at least one filter targets the platform-tag namespace at
    /// all. Filters naming no known platform are someone else's filters and
    /// must not force skips here.
    pub fn targets_platforms(&self) -> bool {
        ALL_PLATFORMS.iter().any(|tag| self.matches(tag))
    }
}

// ============================================================================
// Decisions
// ============================================================================

fn entry<'m>(
    matrix: &'m Matrix,
    op: Op,
    codec: &str,
    mode: Mode,
) -> Result<&'m RequirementEntry, HarnessError> {
    matrix
        .lookup(op, codec, mode)
        .ok_or_else(|| HarnessError::MissingCapability(format!("{op}:{codec}:{mode}")))
}

fn decide(
    platforms: &BTreeSet<String>,
    requires: &[Requirement],
    filters: &[String],
) -> Verdict {
    // disjoint stage support leaves nothing to run on
    if platforms.is_empty() {
        return Verdict::Skip("unsupported platform".to_string());
    }

    let matcher = PlatformMatcher::new(filters);
    if matcher.targets_platforms() && !platforms.iter().any(|p| matcher.matches(p)) {
        return Verdict::Skip("unsupported platform".to_string());
    }

    let unmet: Vec<&str> = requires
        .iter()
        .filter(|r| !r.satisfied)
        .map(|r| r.diagnostic.as_str())
        .collect();
    if !unmet.is_empty() {
        return Verdict::Skip(format!(
            "One or more software requirements not met: {unmet:?}"
        ));
    }

    Verdict::Run
}

/// VDENC feature-family tag for a codec.
fn vdenc_tag(codec: &str) -> &'static str {
    match codec {
        "vp8" | "vp9" => "vp9_8",
        "hevc" | "hevc-8" => "hevc_8",
        _ => "avc",
    }
}

/// Decision for a single-stream encode case.
pub fn encode_verdict(
    matrix: &Matrix,
    t: &ParameterTuple,
    filters: &[String],
    current_platform: Option<&str>,
) -> Result<Verdict, HarnessError> {
    let enc = entry(matrix, Op::Encode, &t.codec, t.mode)?;
    let mut requires = vec![enc.requirement.clone()];
    if t.lowpower {
        requires.push(have_caps("vdenc", vdenc_tag(&t.codec), current_platform));
    }
    Ok(decide(&enc.platforms, &requires, filters))
}

/// Decision for a transcode fan-out case.
///
/// The decode stage seeds the platform intersection; every output branch
/// intersects in its encode platforms and, when it overrides resolution, the
/// scale platforms for its mode. Every collected requirement must hold.
pub fn transcode_verdict(
    matrix: &Matrix,
    t: &ParameterTuple,
    filters: &[String],
) -> Result<Verdict, HarnessError> {
    if t.outputs.is_empty() {
        return Err(HarnessError::InvalidSpec(format!(
            "case '{}': outputs data empty",
            t.case
        )));
    }

    let decode = entry(matrix, Op::Decode, &t.codec, t.mode)?;
    let mut platforms = decode.platforms.clone();
    let mut requires = vec![decode.requirement.clone()];

    for output in &t.outputs {
        let enc = entry(matrix, Op::Encode, &output.codec, output.mode)?;
        platforms = &platforms & &enc.platforms;
        requires.push(enc.requirement.clone());

        if output.width.is_some() || output.height.is_some() {
            let scale = entry(matrix, Op::Vpp, "scale", output.mode)?;
            platforms = &platforms & &scale.platforms;
            requires.push(scale.requirement.clone());
        }
    }

    Ok(decide(&platforms, &requires, filters))
}
