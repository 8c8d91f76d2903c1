// End-to-end driver flow with fake collaborators: the executor records
// every command and materializes the files a pipeline would produce, the
// quality probe returns canned scores. No GStreamer required.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::tempdir;

use vacheck::engine::artifacts::ArtifactStore;
use vacheck::engine::baseline::BaselineStore;
use vacheck::engine::caps::Mode;
use vacheck::engine::executor::Executor;
use vacheck::engine::metrics::{PsnrScore, QualityProbe, SsimScore};
use vacheck::engine::params::{OutputDescriptor, ParameterTuple, expand};
use vacheck::runner::{CaseStatus, Runner};

use crate::common::helpers::*;

struct FakeExecutor {
    /// Only paths under this root are materialized (filesrc locations point
    /// at media files that must not be touched).
    root: PathBuf,
    artifact_size: u64,
    log: RefCell<Vec<String>>,
}

impl FakeExecutor {
    fn new(root: &Path, artifact_size: u64) -> Self {
        FakeExecutor {
            root: root.to_path_buf(),
            artifact_size,
            log: RefCell::new(Vec::new()),
        }
    }

    fn commands(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl Executor for FakeExecutor {
    fn call(&self, command: &str) -> Result<String> {
        self.log.borrow_mut().push(command.to_string());
        for token in command.split_whitespace() {
            let target = token
                .strip_prefix("location=")
                .or_else(|| token.strip_prefix("dump-location="));
            if let Some(path) = target {
                let path = Path::new(path.trim_end_matches("transcoder."));
                if path.starts_with(&self.root) {
                    fs::write(path, vec![0u8; self.artifact_size as usize])?;
                }
            }
        }
        Ok(String::new())
    }
}

struct CannedProbe {
    psnr: PsnrScore,
    ssim: SsimScore,
}

impl Default for CannedProbe {
    fn default() -> Self {
        CannedProbe {
            psnr: PsnrScore {
                y: 40.0,
                u: 42.0,
                v: 42.0,
            },
            ssim: SsimScore {
                y: 1.0,
                u: 1.0,
                v: 1.0,
            },
        }
    }
}

impl QualityProbe for CannedProbe {
    fn psnr(&self, _: &Path, _: &Path, _: u32, _: u32, _: u32, _: &str) -> Result<PsnrScore> {
        Ok(self.psnr)
    }

    fn ssim(&self, _: &Path, _: &Path, _: u32, _: u32, _: u32, _: &str) -> Result<SsimScore> {
        Ok(self.ssim)
    }
}

fn cqp_tuple() -> ParameterTuple {
    expand(
        &sample_spec(),
        "avc",
        Mode::Hw,
        "main",
        vec![("city-352x288", cqp(1, 28))],
    )
    .unwrap()
    .remove(0)
}

#[test]
fn test_encode_case_passes_and_purges_intermediates() {
    let dir = tempdir().unwrap();
    let artifacts = ArtifactStore::new(dir.path().join("artifacts")).unwrap();
    let executor = FakeExecutor::new(artifacts.root(), 4096);
    let probe = CannedProbe::default();
    let matrix = test_matrix();
    let mut baseline = BaselineStore::load(&dir.path().join("baseline.json"), true).unwrap();

    let t = cqp_tuple();
    let result = {
        let mut runner = Runner {
            matrix: &matrix,
            executor: &executor,
            probe: &probe,
            artifacts: &artifacts,
            baseline: &mut baseline,
            filters: &[],
            current_platform: None,
        };
        runner.run_encode_case(&t)
    };

    assert_eq!(result.status, CaseStatus::Passed, "{:?}", result.reason);
    assert_eq!(result.name, "city-352x288-cqp-main-30-28-1-4");

    let commands = executor.commands();
    assert_eq!(commands.len(), 2, "encode + decode-back");
    assert!(commands[0].contains("vaapih264enc"));
    assert!(commands[1].contains("vaapih264dec"));

    // the encoded artifact stays, the decoded yuv is purged
    assert!(artifacts.path("city-352x288-cqp-main-30-28-1-4.h264").exists());
    assert!(!artifacts
        .path("city-352x288-cqp-main-30-28-1-4-352x288-I420.yuv")
        .exists());
    // baseline recorded under the bare case context
    assert!(baseline.get("city-352x288").is_some());
}

#[test]
fn test_encode_case_cbr_gap_fails_with_actuals() {
    let dir = tempdir().unwrap();
    let artifacts = ArtifactStore::new(dir.path().join("artifacts")).unwrap();
    // 56320 bytes over 100 frames at 30 fps → 132 kbps vs a 5000 kbps target
    let executor = FakeExecutor::new(artifacts.root(), 56320);
    let probe = CannedProbe::default();
    let matrix = test_matrix();
    let mut baseline = BaselineStore::load(&dir.path().join("baseline.json"), true).unwrap();

    let mut t = expand(
        &sample_spec(),
        "avc",
        Mode::Hw,
        "main",
        vec![("crowd-640x360", cbr(5000, 30))],
    )
    .unwrap()
    .remove(0);
    t.frames = 100;

    let result = {
        let mut runner = Runner {
            matrix: &matrix,
            executor: &executor,
            probe: &probe,
            artifacts: &artifacts,
            baseline: &mut baseline,
            filters: &[],
            current_platform: None,
        };
        runner.run_encode_case(&t)
    };

    assert_eq!(result.status, CaseStatus::Failed);
    let reason = result.reason.unwrap();
    assert!(reason.contains("bitrate"), "actuals missing: {reason}");
    // validation aborts the case before the decode-back runs
    assert_eq!(executor.commands().len(), 1);
}

#[test]
fn test_transcode_case_checks_every_branch_context() {
    let dir = tempdir().unwrap();
    let artifacts = ArtifactStore::new(dir.path().join("artifacts")).unwrap();
    let executor = FakeExecutor::new(artifacts.root(), 4096);
    let probe = CannedProbe::default();
    let matrix = test_matrix();
    let mut baseline = BaselineStore::load(&dir.path().join("baseline.json"), true).unwrap();

    let mut t = cqp_tuple();
    t.outputs = vec![
        output("hevc-8", Mode::Hw, 2),
        OutputDescriptor {
            codec: "avc".to_string(),
            mode: Mode::Hw,
            width: Some(176),
            height: Some(144),
            channels: 1,
        },
    ];

    let result = {
        let mut runner = Runner {
            matrix: &matrix,
            executor: &executor,
            probe: &probe,
            artifacts: &artifacts,
            baseline: &mut baseline,
            filters: &[],
            current_platform: None,
        };
        runner.run_transcode_case(&t)
    };
    assert_eq!(result.status, CaseStatus::Passed, "{:?}", result.reason);

    // one tee invocation plus a decode-back per produced channel
    let commands = executor.commands();
    assert_eq!(commands.len(), 4);
    assert!(commands[0].contains("tee name=transcoder"));

    // per-(branch, channel) baseline contexts were recorded
    assert!(baseline.get("city-352x288:0:0").is_some());
    assert!(baseline.get("city-352x288:0:1").is_some());
    assert!(baseline.get("city-352x288:1:0").is_some());
    assert!(baseline.get("city-352x288:2:0").is_none());
}

#[test]
fn test_csc_case_fails_below_threshold() {
    let dir = tempdir().unwrap();
    let artifacts = ArtifactStore::new(dir.path().join("artifacts")).unwrap();
    let executor = FakeExecutor::new(artifacts.root(), 4096);
    let matrix = test_matrix();
    let mut baseline = BaselineStore::load(&dir.path().join("baseline.json"), true).unwrap();
    let spec = sample_spec();
    let params = spec.get("city-352x288").unwrap();

    // imperfect conversion against the perfect-score default metric
    let probe = CannedProbe {
        ssim: SsimScore {
            y: 0.99,
            u: 1.0,
            v: 1.0,
        },
        ..CannedProbe::default()
    };
    let result = {
        let mut runner = Runner {
            matrix: &matrix,
            executor: &executor,
            probe: &probe,
            artifacts: &artifacts,
            baseline: &mut baseline,
            filters: &[],
            current_platform: None,
        };
        runner.run_csc_case("city-352x288", params, "NV12", Mode::Hw)
    };
    assert_eq!(result.status, CaseStatus::Failed);
    assert!(result.reason.unwrap().contains("ssim"));

    // an unmapped conversion target skips instead
    let probe = CannedProbe::default();
    let result = {
        let mut runner = Runner {
            matrix: &matrix,
            executor: &executor,
            probe: &probe,
            artifacts: &artifacts,
            baseline: &mut baseline,
            filters: &[],
            current_platform: None,
        };
        runner.run_csc_case("city-352x288", params, "Y410", Mode::Hw)
    };
    assert_eq!(result.status, CaseStatus::Skipped);
}
