use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vacheck::cli::{Cli, Commands};
use vacheck::config::Config;
use vacheck::engine::artifacts::ArtifactStore;
use vacheck::engine::baseline::BaselineStore;
use vacheck::engine::caps::{AssumeAvailable, BackendProbe, GstInspectProbe, Matrix};
use vacheck::engine::executor::ProcessExecutor;
use vacheck::engine::metrics::FfmpegQualityProbe;
use vacheck::runner::{self, Runner, collect_summary};
use vacheck::spec::{TestSpec, discover_specs};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::CheckBackend => check_backend(),
        Commands::List { spec } => list(&spec),
        Commands::DryRun {
            spec,
            codec,
            mode,
            profile,
            rc,
        } => dry_run(&spec, &codec, mode.into(), &profile, rc.into()),
        Commands::Run {
            spec,
            codec,
            mode,
            profile,
            rc,
            filters,
            artifacts,
            timeout,
            rebase,
            json,
        } => run(RunArgs {
            spec,
            codec,
            mode: mode.into(),
            profile,
            rc: rc.into(),
            filters,
            artifacts,
            timeout,
            rebase,
            json,
        }),
    }
}

fn check_backend() -> Result<ExitCode> {
    let probe = GstInspectProbe;
    let mut ok = true;
    for element in ["vaapih264dec", "vaapih264enc", "vaapipostproc", "checksumsink2"] {
        let found = probe.has_element(element);
        println!("{element}: {}", if found { "found" } else { "MISSING" });
        ok &= found;
    }
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn load_specs(path: &Path) -> Result<Vec<(std::path::PathBuf, TestSpec)>> {
    let files = if path.is_dir() {
        discover_specs(path)
    } else {
        vec![path.to_path_buf()]
    };
    files
        .into_iter()
        .map(|file| TestSpec::load(&file).map(|spec| (file, spec)))
        .collect()
}

fn list(path: &Path) -> Result<ExitCode> {
    for (file, spec) in load_specs(path)? {
        println!("{}:", file.display());
        for (case, params) in &spec.cases {
            println!(
                "  {case} ({}x{}, {} frames, {})",
                params.width, params.height, params.frames, params.format
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn dry_run(
    path: &Path,
    codec: &str,
    mode: vacheck::engine::caps::Mode,
    profile: &str,
    rc: vacheck::engine::params::RateControl,
) -> Result<ExitCode> {
    let spec = TestSpec::load(path)?;
    let matrix = Matrix::build(&AssumeAvailable);
    let artifacts = ArtifactStore::new(std::env::temp_dir().join("vacheck_dry_run"))?;
    for tuple in runner::plan_cases(&spec, codec, mode, profile, rc)? {
        match runner::render_encode_command(&matrix, &tuple, &artifacts)? {
            Some(command) => println!("{command}"),
            None => println!("# {}: skipped (no backend mapping)", tuple.case),
        }
    }
    Ok(ExitCode::SUCCESS)
}

struct RunArgs {
    spec: std::path::PathBuf,
    codec: String,
    mode: vacheck::engine::caps::Mode,
    profile: String,
    rc: vacheck::engine::params::RateControl,
    filters: Vec<String>,
    artifacts: Option<std::path::PathBuf>,
    timeout: Option<u64>,
    rebase: bool,
    json: bool,
}

fn run(args: RunArgs) -> Result<ExitCode> {
    let config = Config::load()?;
    let spec = TestSpec::load(&args.spec)?;

    let matrix = Matrix::build(&GstInspectProbe);
    let timeout = args.timeout.or(config.run.call_timeout_s);
    let executor =
        ProcessExecutor::with_timeout(timeout.map(std::time::Duration::from_secs));
    let probe = FfmpegQualityProbe::new(&executor);
    let artifacts = match &args.artifacts {
        Some(dir) => ArtifactStore::new(dir.clone())?,
        None => ArtifactStore::for_run(&config.run.artifact_dir)?,
    };
    let baseline_path = config
        .baseline
        .path
        .clone()
        .unwrap_or_else(BaselineStore::default_path);
    let mut baseline =
        BaselineStore::load(&baseline_path, args.rebase || config.baseline.rebase)?;

    let mut filters = config.run.filters.clone();
    filters.extend(args.filters.iter().cloned());

    let tuples = runner::plan_cases(&spec, &args.codec, args.mode, &args.profile, args.rc)?;
    let summary = {
        let mut harness = Runner {
            matrix: &matrix,
            executor: &executor,
            probe: &probe,
            artifacts: &artifacts,
            baseline: &mut baseline,
            filters: &filters,
            current_platform: config.run.platform.clone(),
        };
        collect_summary(&tuples, |tuple| harness.run_encode_case(tuple))
    };
    baseline.save().context("failed to persist baseline")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for result in &summary.results {
            let reason = result.reason.as_deref().unwrap_or("");
            println!("{:?} {} {reason}", result.status, result.name);
        }
        println!(
            "passed {} / skipped {} / failed {} in {} ms",
            summary.count(vacheck::runner::CaseStatus::Passed),
            summary.count(vacheck::runner::CaseStatus::Skipped),
            summary.count(vacheck::runner::CaseStatus::Failed),
            summary.total_duration_ms
        );
    }

    Ok(if summary.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
