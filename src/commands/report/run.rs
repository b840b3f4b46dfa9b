use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::ReportArgs;
use crate::model::{ReportCounts, ReportManifest, ReportOptions, ResolvedRun, RunRow};
use crate::util::{ensure_directory, now_utc_string, sha256_file, write_json_pretty, write_text_file};

use super::coverage::{
    CanonicalRunMatcher, CoverageRow, build_coverage_rows, count_canonical_runs,
    summarize_mandatory,
};
use super::matrix::{MatrixOutcome, write_best_matrix};
use super::metadata::{MetadataTable, load_metadata};
use super::output::{
    AGGREGATE_STATS_FILE, COVERAGE_FILE, GROUP_STATS_FILE, HTML_FILE, MANIFEST_FILE,
    MARKDOWN_FILE, ReportDocument, WINNERS_FILE, aggregate_stats_csv, coverage_csv,
    group_stats_csv, render_html, render_markdown, winners_csv,
};
use super::stats::{build_aggregate_stats, build_group_stats, group_runs};
use super::store::{load_runs, open_store};
use super::winners::select_winners;

const MANIFEST_VERSION: u32 = 1;

pub fn run(args: ReportArgs) -> Result<()> {
    let options = ReportOptions {
        include_optional: args.include_optional,
        canonical_only: args.canonical_only,
        expected_repetitions: args.expected_repetitions,
    };

    info!(
        db = %args.db.display(),
        metadata = %args.metadata.display(),
        out = %args.out.display(),
        include_optional = options.include_optional,
        canonical_only = options.canonical_only,
        expected_repetitions = options.expected_repetitions,
        "report build requested"
    );

    ensure_directory(&args.out)?;
    let metadata = load_metadata(&args.metadata, options.include_optional)?;
    let connection = open_store(&args.db)?;
    let runs = load_runs(&connection)?;

    let (resolved, unresolved) = partition_resolved(&runs);
    for run in &unresolved {
        warn!(
            run_id = %run.run_id,
            experiment_id = %run.experiment_id,
            problem_type = %run.problem_type,
            problem = %problem_section(run),
            "run excluded: instance parameters unavailable"
        );
    }

    let matcher = CanonicalRunMatcher::new()?;
    let metric_runs = select_metric_runs(&resolved, &metadata, &options, &matcher);
    let groups = group_runs(metric_runs.iter().copied());
    let stats = build_group_stats(&groups, &metadata);
    let aggregates = build_aggregate_stats(&groups);
    let winners = select_winners(&stats);

    let coverage_counts = count_canonical_runs(&resolved, &matcher);
    let coverage = build_coverage_rows(&metadata, &coverage_counts, options.expected_repetitions);

    info!(
        runs_aggregated = metric_runs.len(),
        groups = stats.len(),
        winners = winners.len(),
        aggregates = aggregates.len(),
        coverage_rows = coverage.len(),
        "statistics computed"
    );

    let mut counts = ReportCounts {
        metadata_rows: metadata.len(),
        runs_loaded: runs.len(),
        runs_unresolved_instance: unresolved.len(),
        runs_aggregated: metric_runs.len(),
        group_rows: stats.len(),
        winner_rows: winners.len(),
        aggregate_rows: aggregates.len(),
        coverage_rows: coverage.len(),
        ..ReportCounts::default()
    };

    let mut outputs = Vec::<String>::new();
    for group in &stats {
        let Some(runs_in_group) = groups.get(&(group.instance_key.clone(), group.algorithm.clone()))
        else {
            continue;
        };
        match write_best_matrix(&connection, &args.out, group, runs_in_group)? {
            MatrixOutcome::Written(path) => {
                counts.matrices_written += 1;
                outputs.push(path.display().to_string());
            }
            MatrixOutcome::Skipped(reason) => {
                counts.matrices_skipped += 1;
                debug!(
                    instance = %group.instance_key,
                    algorithm = %group.algorithm,
                    reason = %reason,
                    "best matrix unavailable"
                );
            }
        }
    }

    let document = ReportDocument {
        options: &options,
        stats: &stats,
        winners: &winners,
        aggregates: &aggregates,
        coverage: &coverage,
        unresolved_runs: unresolved.len(),
    };
    let markdown = render_markdown(&document);

    for (file_name, contents) in [
        (GROUP_STATS_FILE, group_stats_csv(&stats)),
        (WINNERS_FILE, winners_csv(&winners)),
        (AGGREGATE_STATS_FILE, aggregate_stats_csv(&aggregates)),
        (COVERAGE_FILE, coverage_csv(&coverage)),
        (HTML_FILE, render_html(&markdown)),
        (MARKDOWN_FILE, markdown),
    ] {
        let path = args.out.join(file_name);
        write_text_file(&path, &contents)?;
        outputs.push(path.display().to_string());
    }

    let manifest_path = args.out.join(MANIFEST_FILE);
    let manifest = ReportManifest {
        manifest_version: MANIFEST_VERSION,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        generated_at: now_utc_string(),
        db_path: args.db.display().to_string(),
        metadata_path: args.metadata.display().to_string(),
        metadata_sha256: sha256_file(&args.metadata)?,
        options,
        counts,
        outputs,
    };
    write_json_pretty(&manifest_path, &manifest)?;

    log_summary(&args.out, &manifest, &coverage);
    Ok(())
}

pub fn partition_resolved(runs: &[RunRow]) -> (Vec<ResolvedRun<'_>>, Vec<&RunRow>) {
    let mut resolved = Vec::<ResolvedRun<'_>>::with_capacity(runs.len());
    let mut unresolved = Vec::<&RunRow>::new();
    for run in runs {
        match run.resolved() {
            Some(entry) => resolved.push(entry),
            None => unresolved.push(run),
        }
    }
    (resolved, unresolved)
}

/// Compact JSON of the run's `problem` config section, for diagnostics.
pub fn problem_section(run: &RunRow) -> String {
    run.config
        .get("problem")
        .map(|problem| problem.to_string())
        .unwrap_or_else(|| "null".to_string())
}

/// Runs that feed statistics: mandatory pairs only unless optional pairs
/// are included, and canonical IDs only when requested.
pub fn select_metric_runs<'a>(
    runs: &[ResolvedRun<'a>],
    metadata: &MetadataTable,
    options: &ReportOptions,
    matcher: &CanonicalRunMatcher,
) -> Vec<ResolvedRun<'a>> {
    runs.iter()
        .copied()
        .filter(|resolved| {
            options.include_optional
                || metadata
                    .get(&(resolved.instance.key(), resolved.run.algorithm.clone()))
                    .is_some_and(|row| row.mandatory)
        })
        .filter(|resolved| !options.canonical_only || matcher.is_canonical_run(resolved))
        .collect()
}

fn log_summary(out_dir: &Path, manifest: &ReportManifest, coverage: &[CoverageRow]) {
    let summary = summarize_mandatory(coverage, None);
    info!(
        out = %out_dir.display(),
        completed = summary.total_completed,
        expected = summary.total_expected,
        completion_pct = %format!("{:.2}", summary.completion_pct()),
        failed = summary.total_failed,
        matrices_written = manifest.counts.matrices_written,
        matrices_skipped = manifest.counts.matrices_skipped,
        "report written"
    );
}
