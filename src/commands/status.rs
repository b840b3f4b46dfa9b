use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::report::{
    CanonicalRunMatcher, build_coverage_rows, count_canonical_runs, load_metadata, load_runs,
    open_store, partition_resolved, summarize_mandatory,
};
use crate::model::Variant;

pub fn run(args: StatusArgs) -> Result<()> {
    info!(
        db = %args.db.display(),
        metadata = %args.metadata.display(),
        "status requested"
    );

    if !args.db.exists() {
        warn!(path = %args.db.display(), "database file missing");
        return Ok(());
    }
    if !args.metadata.exists() {
        warn!(path = %args.metadata.display(), "metadata table missing");
        return Ok(());
    }

    let metadata = load_metadata(&args.metadata, args.include_optional)?;
    let connection = open_store(&args.db)?;
    let runs = load_runs(&connection)?;
    let (resolved, unresolved) = partition_resolved(&runs);

    let matcher = CanonicalRunMatcher::new()?;
    let counts = count_canonical_runs(&resolved, &matcher);
    let coverage = build_coverage_rows(&metadata, &counts, args.expected_repetitions);

    for variant in Variant::all() {
        let summary = summarize_mandatory(&coverage, Some(variant));
        if summary.pairs == 0 {
            continue;
        }
        info!(
            variant = %variant,
            pairs = summary.pairs,
            incomplete_pairs = summary.incomplete_pairs,
            completed = summary.total_completed,
            expected = summary.total_expected,
            failed = summary.total_failed,
            completion_pct = %format!("{:.2}", summary.completion_pct()),
            "variant coverage"
        );
    }

    let summary = summarize_mandatory(&coverage, None);
    info!(
        runs = runs.len(),
        unresolved_runs = unresolved.len(),
        pairs = summary.pairs,
        incomplete_pairs = summary.incomplete_pairs,
        completed = summary.total_completed,
        expected = summary.total_expected,
        failed = summary.total_failed,
        completion_pct = %format!("{:.2}", summary.completion_pct()),
        "campaign coverage"
    );

    Ok(())
}
