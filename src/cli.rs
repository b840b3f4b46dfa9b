use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "adm-report",
    version,
    about = "Comparative DM/RM/ADM paper-suite reporting over persisted EDA runs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Report(ReportArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[arg(long, default_value = "edaf-v3.db")]
    pub db: PathBuf,

    #[arg(long, default_value = "configs/adm_paper_suite/paper-suite-metadata.csv")]
    pub metadata: PathBuf,

    #[arg(long, default_value = "reports/adm_paper_suite")]
    pub out: PathBuf,

    /// Include (instance, algorithm) pairs not flagged mandatory.
    #[arg(long, default_value_t = false)]
    pub include_optional: bool,

    /// Restrict metric rows to canonical `-rNN` run IDs.
    #[arg(long, default_value_t = false)]
    pub canonical_only: bool,

    #[arg(long, default_value_t = 30)]
    pub expected_repetitions: u32,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "edaf-v3.db")]
    pub db: PathBuf,

    #[arg(long, default_value = "configs/adm_paper_suite/paper-suite-metadata.csv")]
    pub metadata: PathBuf,

    #[arg(long, default_value_t = false)]
    pub include_optional: bool,

    #[arg(long, default_value_t = 30)]
    pub expected_repetitions: u32,
}
