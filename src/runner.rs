//! Case driver: expansion output → skip decision → pipeline execution →
//! validation, with structured per-case results.
//!
//! Cases are independent; everything case-local is built here and discarded
//! when the case finishes. The driver owns translating typed verdicts and
//! validation failures into reportable outcomes.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::engine::artifacts::ArtifactStore;
use crate::engine::baseline::{BaselineStore, context_key};
use crate::engine::caps::{Matrix, Mode, Op};
use crate::engine::decision::{Verdict, encode_verdict, transcode_verdict};
use crate::engine::executor::Executor;
use crate::engine::formats;
use crate::engine::metrics::{MetricScore, MetricSpec, QualityProbe};
use crate::engine::options::{artifact_name, encoder_stage};
use crate::engine::params::{self, ParameterTuple, RateControl};
use crate::engine::pipeline::{self, RawInput, TranscodeBranch};
use crate::engine::validate::{BitrateReport, check_bitrate, check_metric, resolve_reference};
use crate::spec::{CaseParams, TestSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub name: String,
    pub status: CaseStatus,
    pub reason: Option<String>,
    pub artifact: Option<String>,
    pub bitrate_kbps: Option<f64>,
    pub bitrate_gap_pct: Option<f64>,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: String,
    pub total_duration_ms: u128,
    pub results: Vec<CaseResult>,
}

impl RunSummary {
    pub fn count(&self, status: CaseStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.status == CaseStatus::Failed)
    }
}

enum CaseOutcome {
    Ran {
        artifact: Option<PathBuf>,
        bitrate: Option<BitrateReport>,
    },
    Skipped(String),
}

/// Per-case driver wiring the engine to its collaborators.
pub struct Runner<'a> {
    pub matrix: &'a Matrix,
    pub executor: &'a dyn Executor,
    pub probe: &'a dyn QualityProbe,
    pub artifacts: &'a ArtifactStore,
    pub baseline: &'a mut BaselineStore,
    pub filters: &'a [String],
    /// Platform tag of the machine under test, when identified.
    pub current_platform: Option<String>,
}

impl Runner<'_> {
    fn call(&self, command: &str, case_timeout: Option<u64>) -> Result<String> {
        self.executor
            .call_with_timeout(command, case_timeout.map(Duration::from_secs))
    }

    fn finish(name: &str, started: Instant, outcome: Result<CaseOutcome>) -> CaseResult {
        let duration_ms = started.elapsed().as_millis();
        match outcome {
            Ok(CaseOutcome::Ran { artifact, bitrate }) => {
                info!(case = name, "passed");
                CaseResult {
                    name: name.to_string(),
                    status: CaseStatus::Passed,
                    reason: None,
                    artifact: artifact.map(|p| p.display().to_string()),
                    bitrate_kbps: bitrate.and_then(|b| {
                        (b.gap_pct.is_some() || b.actual_kbps > 0.0).then_some(b.actual_kbps)
                    }),
                    bitrate_gap_pct: bitrate.and_then(|b| b.gap_pct),
                    duration_ms,
                }
            }
            Ok(CaseOutcome::Skipped(reason)) => {
                warn!(case = name, reason = %reason, "skipped");
                CaseResult {
                    name: name.to_string(),
                    status: CaseStatus::Skipped,
                    reason: Some(reason),
                    artifact: None,
                    bitrate_kbps: None,
                    bitrate_gap_pct: None,
                    duration_ms,
                }
            }
            Err(err) => {
                let reason = format!("{err:#}");
                error!(case = name, error = %reason, "failed");
                CaseResult {
                    name: name.to_string(),
                    status: CaseStatus::Failed,
                    reason: Some(reason),
                    artifact: None,
                    bitrate_kbps: None,
                    bitrate_gap_pct: None,
                    duration_ms,
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Encode
    // ------------------------------------------------------------------

    pub fn run_encode_case(&mut self, t: &ParameterTuple) -> CaseResult {
        let started = Instant::now();
        let name = artifact_name(t);
        let outcome = self.encode_case_inner(t, &name);
        Self::finish(&name, started, outcome)
    }

    fn encode_case_inner(&mut self, t: &ParameterTuple, name: &str) -> Result<CaseOutcome> {
        let Some(mapped_profile) = formats::map_profile(&t.codec, &t.profile) else {
            return Ok(CaseOutcome::Skipped(format!(
                "{} profile is not supported",
                t.profile
            )));
        };
        let (Some(parse_format), Some(caps_format)) = (
            formats::map_format(&t.format),
            formats::map_format_caps(&t.format),
        ) else {
            return Ok(CaseOutcome::Skipped(format!(
                "{} format not supported",
                t.format
            )));
        };
        let ext = formats::file_ext(&t.codec)
            .ok_or_else(|| anyhow!("no file extension for codec '{}'", t.codec))?;

        match encode_verdict(self.matrix, t, self.filters, self.current_platform.as_deref())? {
            Verdict::Skip(reason) => return Ok(CaseOutcome::Skipped(reason)),
            Verdict::Run => {}
        }

        let template = self.matrix.template(Op::Encode, &t.codec, t.mode)?;
        let factory = template
            .first_element()
            .ok_or_else(|| anyhow!("encode template for '{}' has no element", t.codec))?;
        let encoder = encoder_stage(factory, t, Some(mapped_profile))?;

        let encoded = self.artifacts.path(&format!("{name}.{ext}"));
        let input = RawInput {
            source: &t.source,
            frames: t.frames,
            parse_format,
            caps_format,
            width: t.width,
            height: t.height,
            fps: t.fps,
        };
        self.call(
            &pipeline::encode_command(&input, &encoder, &encoded),
            t.call_timeout,
        )?;

        let size = fs::metadata(&encoded)
            .with_context(|| format!("missing encoded artifact {}", encoded.display()))?
            .len();
        let bitrate = check_bitrate(t, size)?;

        // decode back and compare against the reference
        let decoded = self
            .artifacts
            .path(&format!("{name}-{}x{}-{}.yuv", t.width, t.height, t.format));
        let decoder = self.matrix.decoder_stage(&t.codec, t.mode, t.width, t.height)?;
        self.call(
            &pipeline::decode_command(&encoded, &decoder, None, caps_format, &decoded),
            t.call_timeout,
        )?;

        let (reference, cmp_format) =
            resolve_reference(&t.source, t.reference.as_deref(), &t.case, &t.format, None);
        self.check_quality(t, &reference, &decoded, &cmp_format, &[])?;
        self.artifacts.purge(&decoded);

        Ok(CaseOutcome::Ran {
            artifact: Some(encoded),
            bitrate: Some(bitrate),
        })
    }

    /// Threshold comparison when the case carries an explicit metric spec,
    /// baseline gating otherwise.
    fn check_quality(
        &mut self,
        t: &ParameterTuple,
        reference: &std::path::Path,
        decoded: &std::path::Path,
        format: &str,
        refctx: &[(usize, usize)],
    ) -> Result<()> {
        match t.metric {
            Some(spec @ MetricSpec::Ssim { .. }) => {
                let score = self
                    .probe
                    .ssim(reference, decoded, t.width, t.height, t.frames, format)?;
                check_metric(&spec, &MetricScore::Ssim(score))?;
            }
            Some(spec @ MetricSpec::Psnr { .. }) => {
                let score = self
                    .probe
                    .psnr(reference, decoded, t.width, t.height, t.frames, format)?;
                check_metric(&spec, &MetricScore::Psnr(score))?;
            }
            None => {
                let score = self
                    .probe
                    .psnr(reference, decoded, t.width, t.height, t.frames, format)?;
                self.baseline
                    .check_psnr(&score, &context_key(&t.case, refctx))?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Transcode fan-out
    // ------------------------------------------------------------------

    pub fn run_transcode_case(&mut self, t: &ParameterTuple) -> CaseResult {
        let started = Instant::now();
        let outcome = self.transcode_case_inner(t);
        Self::finish(&t.case, started, outcome)
    }

    fn transcode_case_inner(&mut self, t: &ParameterTuple) -> Result<CaseOutcome> {
        match transcode_verdict(self.matrix, t, self.filters)? {
            Verdict::Skip(reason) => return Ok(CaseOutcome::Skipped(reason)),
            Verdict::Run => {}
        }

        let decoder = self.matrix.decoder_stage(&t.codec, t.mode, t.width, t.height)?;

        let mut branches = Vec::with_capacity(t.outputs.len());
        for (n, output) in t.outputs.iter().enumerate() {
            let ext = formats::file_ext(&output.codec)
                .ok_or_else(|| anyhow!("no file extension for codec '{}'", output.codec))?;
            let encoder = self
                .matrix
                .template(Op::Encode, &output.codec, output.mode)?
                .instantiate_dims(t.width, t.height);
            let scale = self.matrix.scale_stage(
                output.width,
                output.height,
                output.mode,
                t.width,
                t.height,
            )?;
            let sinks = (0..output.channels)
                .map(|channel| {
                    self.artifacts
                        .path(&format!("{}_{n}_{channel}.{ext}", t.case))
                })
                .collect();
            branches.push(TranscodeBranch {
                scale,
                encoder,
                sinks,
            });
        }

        let source_dump = self.artifacts.path(&format!("src_{}.yuv", t.case));
        self.call(
            &pipeline::transcode_command(&t.source, &decoder, &branches, &source_dump),
            t.call_timeout,
        )?;

        // every produced stream decodes back and checks against the decoded
        // source, scoped by its (branch, channel) reference context
        for (n, output) in t.outputs.iter().enumerate() {
            for channel in 0..output.channels as usize {
                let encoded = &branches[n].sinks[channel];
                let decoded = self
                    .artifacts
                    .path(&format!("{}_{n}_{channel}.yuv", t.case));
                let branch_decoder =
                    self.matrix
                        .decoder_stage(&output.codec, Mode::Hw, t.width, t.height)?;
                let rescale = self.matrix.scale_stage(
                    Some(t.width),
                    Some(t.height),
                    Mode::Hw,
                    t.width,
                    t.height,
                )?;
                self.call(
                    &pipeline::decode_command(
                        encoded,
                        &branch_decoder,
                        rescale.as_ref(),
                        "I420",
                        &decoded,
                    ),
                    t.call_timeout,
                )?;

                let score = self.probe.psnr(
                    &source_dump,
                    &decoded,
                    t.width,
                    t.height,
                    t.frames,
                    "I420",
                )?;
                self.baseline
                    .check_psnr(&score, &context_key(&t.case, &[(n, channel)]))?;
                self.artifacts.purge(&decoded);
            }
        }

        Ok(CaseOutcome::Ran {
            artifact: Some(source_dump),
            bitrate: None,
        })
    }

    // ------------------------------------------------------------------
    // VPP color-space conversion
    // ------------------------------------------------------------------

    pub fn run_csc_case(
        &mut self,
        case: &str,
        params: &CaseParams,
        csc_target: &str,
        mode: Mode,
    ) -> CaseResult {
        let started = Instant::now();
        let name = format!(
            "{case}_{}_csc_{csc_target}_{}x{}",
            params.format, params.width, params.height
        );
        let outcome = self.csc_case_inner(case, params, csc_target, mode);
        Self::finish(&name, started, outcome)
    }

    fn csc_case_inner(
        &mut self,
        case: &str,
        params: &CaseParams,
        csc_target: &str,
        mode: Mode,
    ) -> Result<CaseOutcome> {
        let (Some(parse_format), Some(caps_format)) = (
            formats::map_format(&params.format),
            formats::map_format_caps(&params.format),
        ) else {
            return Ok(CaseOutcome::Skipped(format!(
                "{} format not supported",
                params.format
            )));
        };
        let Some(mapped_csc) = formats::map_csc(csc_target) else {
            return Ok(CaseOutcome::Skipped(format!(
                "{csc_target} format not supported"
            )));
        };

        let csc_stage = self
            .matrix
            .template(Op::Vpp, "csc", mode)?
            .instantiate(&[("format", mapped_csc.to_string())]);

        let converted = self.artifacts.path(&format!(
            "{case}_{}_csc_{csc_target}_{}x{}.yuv",
            params.format, params.width, params.height
        ));
        let input = RawInput {
            source: &params.source,
            frames: params.frames,
            parse_format,
            caps_format,
            width: params.width,
            height: params.height,
            fps: params.fps,
        };
        self.call(
            &pipeline::csc_command(&input, &csc_stage, &converted),
            params.call_timeout,
        )?;

        let (reference, cmp_format) = resolve_reference(
            &params.source,
            params.reference.as_deref(),
            case,
            &params.format,
            Some(csc_target),
        );
        let metric = params.metric.unwrap_or_default();
        let score = match metric {
            MetricSpec::Ssim { .. } => MetricScore::Ssim(self.probe.ssim(
                &reference,
                &converted,
                params.width,
                params.height,
                params.frames,
                &cmp_format,
            )?),
            MetricSpec::Psnr { .. } => MetricScore::Psnr(self.probe.psnr(
                &reference,
                &converted,
                params.width,
                params.height,
                params.frames,
                &cmp_format,
            )?),
        };
        check_metric(&metric, &score)?;
        self.artifacts.purge(&converted);

        Ok(CaseOutcome::Ran {
            artifact: None,
            bitrate: None,
        })
    }
}

/// Run a closure per tuple and collect the summary.
pub fn collect_summary<F>(tuples: &[ParameterTuple], mut run: F) -> RunSummary
where
    F: FnMut(&ParameterTuple) -> CaseResult,
{
    let started = Instant::now();
    let started_at = Utc::now().to_rfc3339();
    let results = tuples.iter().map(&mut run).collect();
    RunSummary {
        started_at,
        total_duration_ms: started.elapsed().as_millis(),
        results,
    }
}

// ============================================================================
// Planning
// ============================================================================

/// Default dimension tables for the CLI driver.
///
/// CQP sweeps intra-only and I/P cadence across a low and a high quantizer;
/// bitrate-controlled modes take the case's bitrate hint when one is set.
fn default_cqp_variants() -> Vec<params::CqpVariant> {
    let mut variants = Vec::new();
    for ipmode in [0u32, 1] {
        for qp in [14u32, 28] {
            variants.push(params::CqpVariant {
                ipmode,
                qp,
                quality: Some(4),
                slices: Some(1),
                refmode: None,
                looplvl: None,
                loopshp: None,
                lowpower: false,
            });
        }
    }
    variants
}

fn default_rates(hint: Option<u32>) -> Vec<u32> {
    match hint {
        Some(bitrate) => vec![bitrate],
        None => vec![2000, 5000],
    }
}

/// Expand a spec into the tuples a run will exercise for one rate-control
/// dimension.
pub fn plan_cases(
    spec: &TestSpec,
    codec: &str,
    mode: Mode,
    profile: &str,
    rc: RateControl,
) -> Result<Vec<ParameterTuple>> {
    let tuples = match rc {
        RateControl::Cqp => {
            let cases: Vec<&str> = spec.case_names().collect();
            let variants = default_cqp_variants();
            params::expand(spec, codec, mode, profile, params::cross(&cases, &variants))?
        }
        RateControl::Cbr => {
            let mut combos = Vec::new();
            for (case, case_params) in &spec.cases {
                for bitrate in default_rates(case_params.bitrate) {
                    combos.push((
                        case.as_str(),
                        params::CbrVariant {
                            gop: 30,
                            bitrate,
                            fps: case_params.fps.unwrap_or(30),
                            slices: Some(1),
                            refmode: None,
                            looplvl: None,
                            loopshp: None,
                            lowpower: false,
                        },
                    ));
                }
            }
            params::expand(spec, codec, mode, profile, combos)?
        }
        RateControl::Vbr => {
            let mut combos = Vec::new();
            for (case, case_params) in &spec.cases {
                for bitrate in default_rates(case_params.bitrate) {
                    combos.push((
                        case.as_str(),
                        params::VbrVariant {
                            gop: 30,
                            bitrate,
                            fps: case_params.fps.unwrap_or(30),
                            quality: Some(4),
                            slices: Some(1),
                            refmode: None,
                            looplvl: None,
                            loopshp: None,
                            lowpower: false,
                        },
                    ));
                }
            }
            params::expand(spec, codec, mode, profile, combos)?
        }
    };
    Ok(tuples)
}

/// Render the encode pipeline a tuple would run, without executing it.
/// `None` when a mapping gap would skip the case.
pub fn render_encode_command(
    matrix: &Matrix,
    t: &ParameterTuple,
    artifacts: &ArtifactStore,
) -> Result<Option<String>> {
    let Some(mapped_profile) = formats::map_profile(&t.codec, &t.profile) else {
        return Ok(None);
    };
    let (Some(parse_format), Some(caps_format)) = (
        formats::map_format(&t.format),
        formats::map_format_caps(&t.format),
    ) else {
        return Ok(None);
    };
    let Some(ext) = formats::file_ext(&t.codec) else {
        return Ok(None);
    };

    let template = matrix.template(Op::Encode, &t.codec, t.mode)?;
    let factory = template
        .first_element()
        .ok_or_else(|| anyhow!("encode template for '{}' has no element", t.codec))?;
    let encoder = encoder_stage(factory, t, Some(mapped_profile))?;
    let encoded = artifacts.path(&format!("{}.{ext}", artifact_name(t)));
    let input = RawInput {
        source: &t.source,
        frames: t.frames,
        parse_format,
        caps_format,
        width: t.width,
        height: t.height,
        fps: t.fps,
    };
    Ok(Some(pipeline::encode_command(&input, &encoder, &encoded)))
}
