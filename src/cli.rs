use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::engine::caps::Mode;
use crate::engine::params::RateControl;

#[derive(Parser)]
#[command(name = "vacheck")]
#[command(about = "Conformance harness for VA-API GStreamer pipelines", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Sw,
    Hw,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sw => Mode::Sw,
            ModeArg::Hw => Mode::Hw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RcArg {
    Cqp,
    Cbr,
    Vbr,
}

impl From<RcArg> for RateControl {
    fn from(rc: RcArg) -> Self {
        match rc {
            RcArg::Cqp => RateControl::Cqp,
            RcArg::Cbr => RateControl::Cbr,
            RcArg::Vbr => RateControl::Vbr,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that gst-launch and the backend elements are installed
    CheckBackend,

    /// List cases from a spec file or spec directory
    List {
        /// Spec file or directory of spec files
        spec: PathBuf,
    },

    /// Show the pipelines a run would execute (dry run)
    DryRun {
        /// Spec file to expand
        spec: PathBuf,

        #[arg(long, default_value = "avc")]
        codec: String,

        #[arg(long, value_enum, default_value = "hw")]
        mode: ModeArg,

        #[arg(long, default_value = "main")]
        profile: String,

        #[arg(long, value_enum, default_value = "cqp")]
        rc: RcArg,
    },

    /// Execute encode cases and validate the artifacts
    Run {
        /// Spec file to expand
        spec: PathBuf,

        #[arg(long, default_value = "avc")]
        codec: String,

        #[arg(long, value_enum, default_value = "hw")]
        mode: ModeArg,

        #[arg(long, default_value = "main")]
        profile: String,

        #[arg(long, value_enum, default_value = "cqp")]
        rc: RcArg,

        /// Platform filter tag (repeatable), e.g. --filter TGL --filter ADL*
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Artifact directory (defaults to a fresh temp-dir per run)
        #[arg(long)]
        artifacts: Option<PathBuf>,

        /// Pipeline timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Record missing baseline contexts instead of failing them
        #[arg(long)]
        rebase: bool,

        /// Emit the run summary as JSON
        #[arg(long)]
        json: bool,
    },
}
