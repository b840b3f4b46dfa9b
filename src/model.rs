use std::fmt;

use anyhow::{Result, bail};
use serde::Serialize;

/// Run identifiers reserved for the paper campaign start with this literal.
pub const CAMPAIGN_RUN_PREFIX: &str = "adm-paper-";

/// Problem families benchmarked by the paper suite.
///
/// Declaration order follows the short codes alphabetically so derived
/// ordering matches ordering by code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variant {
    Adm,
    Dm,
    Rm,
}

impl Variant {
    pub fn from_problem_type(problem_type: &str) -> Result<Self> {
        match problem_type {
            "disjunct-matrix" => Ok(Self::Dm),
            "resolvable-matrix" => Ok(Self::Rm),
            "almost-disjunct-matrix" => Ok(Self::Adm),
            other => bail!("unsupported problem type in paper suite: {other}"),
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        match code.trim() {
            "dm" => Ok(Self::Dm),
            "rm" => Ok(Self::Rm),
            "adm" => Ok(Self::Adm),
            other => bail!("unknown variant: {other}"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dm => "dm",
            Self::Rm => "rm",
            Self::Adm => "adm",
        }
    }

    /// Best fitness at or below this value counts as a solved run.
    pub fn target_fitness(self) -> f64 {
        match self {
            Self::Dm | Self::Rm => 0.0,
            Self::Adm => 1.0e-4,
        }
    }

    pub fn success_criterion(self) -> &'static str {
        match self {
            Self::Dm => "`fit1 == 0`",
            Self::Rm => "`fit2 == 0`",
            Self::Adm => "`fit3 <= 1e-4`",
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Dm, Self::Rm, Self::Adm]
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one benchmark instance.
///
/// The derived key pads `m` and `n` to two digits; values of 100 or more
/// would no longer sort or join consistently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceKey {
    pub variant: Variant,
    pub t: u32,
    pub m: u32,
    pub n: u32,
}

impl InstanceKey {
    pub fn key(&self) -> String {
        format!(
            "{}-t{}-m{:02}-n{:02}",
            self.variant.as_str(),
            self.t,
            self.m,
            self.n
        )
    }

    /// Ordering used by the report document: (variant, t, m, n).
    pub fn sort_tuple(&self) -> (Variant, u32, u32, u32) {
        (self.variant, self.t, self.m, self.n)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Failed,
    Other(String),
}

impl RunStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One persisted execution attempt, read once per report build.
#[derive(Debug, Clone)]
pub struct RunRow {
    pub run_id: String,
    pub experiment_id: String,
    pub algorithm: String,
    pub problem_type: String,
    pub status: RunStatus,
    pub best_fitness: Option<f64>,
    pub evaluations: Option<i64>,
    pub runtime_millis: Option<i64>,
    pub config: serde_json::Value,
    pub variant: Variant,
    /// `None` when the run configuration lacks t, m or n.
    pub instance: Option<InstanceKey>,
}

/// A run whose instance parameters resolved, so it can join the key space.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRun<'a> {
    pub run: &'a RunRow,
    pub instance: &'a InstanceKey,
}

impl RunRow {
    pub fn resolved(&self) -> Option<ResolvedRun<'_>> {
        self.instance
            .as_ref()
            .map(|instance| ResolvedRun { run: self, instance })
    }
}

/// One intended (instance, algorithm) work item from the metadata table.
#[derive(Debug, Clone)]
pub struct MetadataRow {
    pub instance_key: String,
    pub algorithm: String,
    pub variant: Variant,
    pub t: u32,
    pub m: u32,
    pub n: u32,
    pub mandatory: bool,
    pub evaluation_mode: String,
    pub subset_count: Option<u64>,
    pub max_exact_subsets: Option<u64>,
    pub sample_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportOptions {
    pub include_optional: bool,
    pub canonical_only: bool,
    pub expected_repetitions: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportCounts {
    pub metadata_rows: usize,
    pub runs_loaded: usize,
    pub runs_unresolved_instance: usize,
    pub runs_aggregated: usize,
    pub group_rows: usize,
    pub winner_rows: usize,
    pub aggregate_rows: usize,
    pub coverage_rows: usize,
    pub matrices_written: usize,
    pub matrices_skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportManifest {
    pub manifest_version: u32,
    pub tool_version: String,
    pub generated_at: String,
    pub db_path: String,
    pub metadata_path: String,
    pub metadata_sha256: String,
    pub options: ReportOptions,
    pub counts: ReportCounts,
    pub outputs: Vec<String>,
}
