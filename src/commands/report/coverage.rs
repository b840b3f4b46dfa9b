use std::collections::HashMap;

use anyhow::{Context, Result};
use regex::Regex;

use crate::model::{CAMPAIGN_RUN_PREFIX, ResolvedRun, RunStatus, Variant};

use super::metadata::{MetadataTable, PairKey};

/// Recognizes planned campaign repetitions:
/// `adm-paper-<instance_key>-<algorithm>-r<digits>`. Smoke and ad-hoc IDs
/// sharing the prefix never match.
pub struct CanonicalRunMatcher {
    suffix: Regex,
}

impl CanonicalRunMatcher {
    pub fn new() -> Result<Self> {
        let suffix =
            Regex::new(r"^-r[0-9]+$").context("failed to compile canonical run suffix regex")?;
        Ok(Self { suffix })
    }

    pub fn canonical_prefix(instance_key: &str, algorithm: &str) -> String {
        format!("{CAMPAIGN_RUN_PREFIX}{instance_key}-{algorithm}")
    }

    pub fn is_canonical(&self, run_id: &str, instance_key: &str, algorithm: &str) -> bool {
        let prefix = Self::canonical_prefix(instance_key, algorithm);
        run_id
            .strip_prefix(&prefix)
            .is_some_and(|suffix| self.suffix.is_match(suffix))
    }

    pub fn is_canonical_run(&self, resolved: &ResolvedRun<'_>) -> bool {
        self.is_canonical(
            &resolved.run.run_id,
            &resolved.instance.key(),
            &resolved.run.algorithm,
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverageCounts {
    pub completed: usize,
    pub failed: usize,
    pub total_canonical: usize,
}

/// Canonical run counts per pair, bucketed by terminal status.
pub fn count_canonical_runs(
    runs: &[ResolvedRun<'_>],
    matcher: &CanonicalRunMatcher,
) -> HashMap<PairKey, CoverageCounts> {
    let mut counts = HashMap::<PairKey, CoverageCounts>::new();

    for resolved in runs.iter().filter(|resolved| matcher.is_canonical_run(resolved)) {
        let entry = counts
            .entry((resolved.instance.key(), resolved.run.algorithm.clone()))
            .or_default();
        entry.total_canonical += 1;
        match resolved.run.status {
            RunStatus::Completed => entry.completed += 1,
            RunStatus::Failed => entry.failed += 1,
            RunStatus::Other(_) => {}
        }
    }

    counts
}

pub fn completion_ratio(completed: usize, expected_repetitions: u32) -> f64 {
    if expected_repetitions == 0 {
        return 0.0;
    }
    completed as f64 / f64::from(expected_repetitions)
}

#[derive(Debug, Clone)]
pub struct CoverageRow {
    pub instance_key: String,
    pub variant: Variant,
    pub t: u32,
    pub m: u32,
    pub n: u32,
    pub algorithm: String,
    pub mandatory: bool,
    pub expected_repetitions: u32,
    pub completed_runs: usize,
    pub failed_runs: usize,
    pub canonical_runs_present: usize,
    pub completion_ratio: f64,
}

/// One row per metadata pair, including pairs that never ran.
pub fn build_coverage_rows(
    metadata: &MetadataTable,
    counts: &HashMap<PairKey, CoverageCounts>,
    expected_repetitions: u32,
) -> Vec<CoverageRow> {
    metadata
        .iter()
        .map(|(pair, meta)| {
            let observed = counts.get(pair).copied().unwrap_or_default();
            CoverageRow {
                instance_key: meta.instance_key.clone(),
                variant: meta.variant,
                t: meta.t,
                m: meta.m,
                n: meta.n,
                algorithm: meta.algorithm.clone(),
                mandatory: meta.mandatory,
                expected_repetitions,
                completed_runs: observed.completed,
                failed_runs: observed.failed,
                canonical_runs_present: observed.total_canonical,
                completion_ratio: completion_ratio(observed.completed, expected_repetitions),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoverageSummary {
    pub pairs: usize,
    pub incomplete_pairs: usize,
    pub total_expected: u64,
    pub total_completed: usize,
    pub total_failed: usize,
}

impl CoverageSummary {
    pub fn completion_pct(&self) -> f64 {
        if self.total_expected == 0 {
            return 0.0;
        }
        100.0 * self.total_completed as f64 / self.total_expected as f64
    }
}

/// Totals over mandatory rows, optionally restricted to one variant.
pub fn summarize_mandatory(rows: &[CoverageRow], variant: Option<Variant>) -> CoverageSummary {
    rows.iter()
        .filter(|row| row.mandatory)
        .filter(|row| variant.is_none_or(|variant| row.variant == variant))
        .fold(CoverageSummary::default(), |mut summary, row| {
            summary.pairs += 1;
            if row.completed_runs < row.expected_repetitions as usize {
                summary.incomplete_pairs += 1;
            }
            summary.total_expected += u64::from(row.expected_repetitions);
            summary.total_completed += row.completed_runs;
            summary.total_failed += row.failed_runs;
            summary
        })
}
