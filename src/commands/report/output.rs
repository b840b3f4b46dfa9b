use crate::model::{ReportOptions, Variant};

use super::coverage::{CoverageRow, summarize_mandatory};
use super::stats::{AggregateStats, GroupStats};
use super::winners::WinnerRow;

pub const GROUP_STATS_FILE: &str = "instance-algorithm-stats.csv";
pub const WINNERS_FILE: &str = "instance-winners.csv";
pub const AGGREGATE_STATS_FILE: &str = "aggregate-stats.csv";
pub const COVERAGE_FILE: &str = "campaign-coverage.csv";
pub const MARKDOWN_FILE: &str = "paper-suite-comparison.md";
pub const HTML_FILE: &str = "paper-suite-comparison.html";
pub const MANIFEST_FILE: &str = "report-manifest.json";

const GROUP_STATS_COLUMNS: [&str; 17] = [
    "variant",
    "t",
    "m",
    "n",
    "instance_key",
    "algorithm",
    "runs",
    "success_rate",
    "mean_evals_to_target",
    "median_evals_to_target",
    "mean_final_best_fit",
    "median_final_best_fit",
    "mean_runtime_ms",
    "evaluation_mode",
    "subset_count",
    "max_exact_subsets",
    "sample_size",
];

const WINNER_COLUMNS: [&str; 9] = [
    "instance_key",
    "variant",
    "t",
    "m",
    "n",
    "winner_algorithm",
    "winner_success_rate",
    "winner_mean_evals_to_target",
    "winner_mean_final_best_fit",
];

const AGGREGATE_COLUMNS: [&str; 10] = [
    "variant",
    "t",
    "algorithm",
    "runs",
    "success_rate",
    "mean_evals_to_target",
    "median_evals_to_target",
    "mean_final_best_fit",
    "median_final_best_fit",
    "mean_runtime_ms",
];

const COVERAGE_COLUMNS: [&str; 12] = [
    "instance_key",
    "variant",
    "t",
    "m",
    "n",
    "algorithm",
    "mandatory",
    "expected_repetitions",
    "completed_runs",
    "failed_runs",
    "canonical_runs_present",
    "completion_ratio",
];

fn table_to_csv(header: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut lines = Vec::<String>::with_capacity(rows.len() + 1);
    lines.push(
        header
            .iter()
            .map(|cell| escape_csv_cell(cell))
            .collect::<Vec<String>>()
            .join(","),
    );
    for row in rows {
        lines.push(
            row.iter()
                .map(|cell| escape_csv_cell(cell))
                .collect::<Vec<String>>()
                .join(","),
        );
    }
    lines.join("\n") + "\n"
}

fn escape_csv_cell(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Shortest round-trip rendering for CSV: whole numbers keep one decimal
/// place, and magnitudes below 1e-4 or from 1e16 up switch to exponent
/// notation with a signed two-digit exponent (`6e-05`).
pub fn csv_float(value: f64) -> String {
    if !value.is_finite() {
        return format!("{value}");
    }
    let magnitude = value.abs();
    if value != 0.0 && !(1.0e-4..1.0e16).contains(&magnitude) {
        let scientific = format!("{value:e}");
        let (mantissa, exponent) = scientific
            .split_once('e')
            .unwrap_or((scientific.as_str(), "0"));
        let exponent = exponent.parse::<i32>().unwrap_or(0);
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exponent.abs());
    }
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Undefined statistics become an empty cell.
pub fn csv_optional(value: Option<f64>) -> String {
    value.map(csv_float).unwrap_or_default()
}

fn csv_optional_count(value: Option<u64>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

pub fn group_stats_csv(stats: &[GroupStats]) -> String {
    let rows = stats
        .iter()
        .map(|row| {
            vec![
                row.instance.variant.to_string(),
                row.instance.t.to_string(),
                row.instance.m.to_string(),
                row.instance.n.to_string(),
                row.instance_key.clone(),
                row.algorithm.clone(),
                row.summary.runs.to_string(),
                csv_float(row.summary.success_rate),
                csv_optional(row.summary.mean_evals_to_target),
                csv_optional(row.summary.median_evals_to_target),
                csv_optional(row.summary.mean_final_best_fit),
                csv_optional(row.summary.median_final_best_fit),
                csv_optional(row.summary.mean_runtime_ms),
                row.evaluation_mode.clone(),
                csv_optional_count(row.subset_count),
                csv_optional_count(row.max_exact_subsets),
                csv_optional_count(row.sample_size),
            ]
        })
        .collect();
    table_to_csv(&GROUP_STATS_COLUMNS, rows)
}

pub fn winners_csv(winners: &[WinnerRow]) -> String {
    let rows = winners
        .iter()
        .map(|row| {
            vec![
                row.instance_key.clone(),
                row.instance.variant.to_string(),
                row.instance.t.to_string(),
                row.instance.m.to_string(),
                row.instance.n.to_string(),
                row.algorithm.clone(),
                csv_float(row.success_rate),
                csv_optional(row.mean_evals_to_target),
                csv_optional(row.mean_final_best_fit),
            ]
        })
        .collect();
    table_to_csv(&WINNER_COLUMNS, rows)
}

pub fn aggregate_stats_csv(aggregates: &[AggregateStats]) -> String {
    let rows = aggregates
        .iter()
        .map(|row| {
            vec![
                row.variant.to_string(),
                row.t.to_string(),
                row.algorithm.clone(),
                row.summary.runs.to_string(),
                csv_float(row.summary.success_rate),
                csv_optional(row.summary.mean_evals_to_target),
                csv_optional(row.summary.median_evals_to_target),
                csv_optional(row.summary.mean_final_best_fit),
                csv_optional(row.summary.median_final_best_fit),
                csv_optional(row.summary.mean_runtime_ms),
            ]
        })
        .collect();
    table_to_csv(&AGGREGATE_COLUMNS, rows)
}

pub fn coverage_csv(coverage: &[CoverageRow]) -> String {
    let rows = coverage
        .iter()
        .map(|row| {
            vec![
                row.instance_key.clone(),
                row.variant.to_string(),
                row.t.to_string(),
                row.m.to_string(),
                row.n.to_string(),
                row.algorithm.clone(),
                row.mandatory.to_string(),
                row.expected_repetitions.to_string(),
                row.completed_runs.to_string(),
                row.failed_runs.to_string(),
                row.canonical_runs_present.to_string(),
                csv_float(row.completion_ratio),
            ]
        })
        .collect();
    table_to_csv(&COVERAGE_COLUMNS, rows)
}

/// `printf("%.{digits}g")` style rendering.
pub fn format_general(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let digits = digits.max(1);
    let scientific = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent = exponent.parse::<i32>().unwrap_or(0);

    if exponent < -4 || exponent >= digits as i32 {
        let mantissa = trim_fraction_zeros(mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        trim_fraction_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Undefined statistics render as `-` in the document.
pub fn format_optional(value: Option<f64>) -> String {
    value
        .map(|value| format_general(value, 6))
        .unwrap_or_else(|| "-".to_string())
}

pub struct ReportDocument<'a> {
    pub options: &'a ReportOptions,
    pub stats: &'a [GroupStats],
    pub winners: &'a [WinnerRow],
    pub aggregates: &'a [AggregateStats],
    pub coverage: &'a [CoverageRow],
    pub unresolved_runs: usize,
}

pub fn render_markdown(document: &ReportDocument<'_>) -> String {
    let mut lines = Vec::<String>::new();
    lines.push("# ADM/DM/RM Paper-Suite Comparative Report".to_string());
    lines.push(String::new());

    push_coverage_section(&mut lines, document);
    push_policy_section(&mut lines, document.stats);
    push_winner_section(&mut lines, document.winners);
    push_aggregate_section(&mut lines, document.aggregates);
    push_notes_section(&mut lines);

    lines.join("\n") + "\n"
}

fn push_coverage_section(lines: &mut Vec<String>, document: &ReportDocument<'_>) {
    let summary = summarize_mandatory(document.coverage, None);

    lines.push("## Campaign Coverage".to_string());
    lines.push(String::new());
    lines.push(format!(
        "- Mandatory completion: `{}/{}` ({:.2}%)",
        summary.total_completed,
        summary.total_expected,
        summary.completion_pct()
    ));
    lines.push(format!(
        "- Mandatory failed canonical runs: `{}`",
        summary.total_failed
    ));
    lines.push(format!(
        "- Coverage target per (instance,algorithm): `{}` canonical repetitions",
        document.options.expected_repetitions
    ));
    lines.push(
        "- Canonical run IDs counted for coverage use pattern: `adm-paper-<instance>-<algorithm>-rXX`."
            .to_string(),
    );
    lines.push(
        "- Smoke/ad-hoc IDs (`-smoke`, `-xsmoke`, `-poptest`) are excluded from coverage accounting."
            .to_string(),
    );
    lines.push(format!(
        "- Metric rows use: {}",
        if document.options.canonical_only {
            "canonical-only run IDs."
        } else {
            "all `adm-paper-*` run IDs (including smoke/ad-hoc)."
        }
    ));
    lines.push(format!(
        "- Runs excluded because instance parameters were unavailable: `{}`",
        document.unresolved_runs
    ));
    lines.push(String::new());
}

fn policy_reason(row: &GroupStats) -> String {
    let subset_count = row.subset_count.unwrap_or(0);
    let max_exact = row.max_exact_subsets.unwrap_or(0);
    if row.evaluation_mode == "exact" {
        format!("C(N,t)={subset_count} <= {max_exact}")
    } else {
        format!(
            "C(N,t)={subset_count} > {max_exact}, sampled with budget={}",
            csv_optional_count(row.sample_size)
        )
    }
}

fn push_policy_section(lines: &mut Vec<String>, stats: &[GroupStats]) {
    lines.push("## Evaluation-Mode Policy".to_string());
    lines.push(String::new());
    lines.push("| Instance | Variant | t | M | N | C(N,t) | Mode | Why |".to_string());
    lines.push("|---|---:|---:|---:|---:|---:|---|---|".to_string());

    let mut ordered = stats.iter().collect::<Vec<&GroupStats>>();
    ordered.sort_by(|left, right| {
        left.instance
            .sort_tuple()
            .cmp(&right.instance.sort_tuple())
            .then_with(|| left.algorithm.cmp(&right.algorithm))
    });

    let mut seen = std::collections::HashSet::<&str>::new();
    for row in ordered {
        if !seen.insert(row.instance_key.as_str()) {
            continue;
        }
        lines.push(format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} |",
            row.instance_key,
            row.instance.variant,
            row.instance.t,
            row.instance.m,
            row.instance.n,
            row.subset_count.unwrap_or(0),
            row.evaluation_mode,
            policy_reason(row)
        ));
    }
    lines.push(String::new());
}

fn push_winner_section(lines: &mut Vec<String>, winners: &[WinnerRow]) {
    lines.push("## Per-Instance Winners".to_string());
    lines.push(String::new());
    lines.push(
        "| Instance | Winner | Success rate | Mean evals-to-target | Mean final best fit |"
            .to_string(),
    );
    lines.push("|---|---|---:|---:|---:|".to_string());

    let mut ordered = winners.iter().collect::<Vec<&WinnerRow>>();
    ordered.sort_by_key(|row| row.instance.sort_tuple());
    for row in ordered {
        lines.push(format!(
            "| {} | {} | {:.3} | {} | {} |",
            row.instance_key,
            row.algorithm,
            row.success_rate,
            format_optional(row.mean_evals_to_target),
            format_optional(row.mean_final_best_fit)
        ));
    }
    lines.push(String::new());
}

fn push_aggregate_section(lines: &mut Vec<String>, aggregates: &[AggregateStats]) {
    lines.push("## Aggregate by (variant, t, algorithm)".to_string());
    lines.push(String::new());
    lines.push(
        "| Variant | t | Algorithm | Runs | Success rate | Mean evals-to-target | Median evals-to-target | Mean final best fit | Mean runtime (ms) |"
            .to_string(),
    );
    lines.push("|---|---:|---|---:|---:|---:|---:|---:|---:|".to_string());

    let mut ordered = aggregates.iter().collect::<Vec<&AggregateStats>>();
    ordered.sort_by(|left, right| {
        (left.variant, left.t)
            .cmp(&(right.variant, right.t))
            .then_with(|| {
                right
                    .summary
                    .success_rate
                    .total_cmp(&left.summary.success_rate)
            })
            .then_with(|| left.algorithm.cmp(&right.algorithm))
    });
    for row in ordered {
        lines.push(format!(
            "| {} | {} | {} | {} | {:.3} | {} | {} | {} | {} |",
            row.variant,
            row.t,
            row.algorithm,
            row.summary.runs,
            row.summary.success_rate,
            format_optional(row.summary.mean_evals_to_target),
            format_optional(row.summary.median_evals_to_target),
            format_optional(row.summary.mean_final_best_fit),
            format_optional(row.summary.mean_runtime_ms)
        ));
    }
    lines.push(String::new());
}

fn push_notes_section(lines: &mut Vec<String>) {
    lines.push("## Notes".to_string());
    lines.push(String::new());
    lines.push("- Success criterion used per variant:".to_string());
    for variant in Variant::all() {
        lines.push(format!(
            "  - {}: {}",
            variant.as_str().to_ascii_uppercase(),
            variant.success_criterion()
        ));
    }
    lines.push(
        "- Winner selection: success rate desc, mean evals-to-target asc, mean final best fitness asc, algorithm name asc."
            .to_string(),
    );
    lines.push("- Best matrix artifacts are under `best_matrices/`.".to_string());
    lines.push(format!(
        "- Coverage details are exported to `{COVERAGE_FILE}`."
    ));
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Minimal HTML page carrying the markdown text verbatim inside `<pre>`.
pub fn render_html(markdown: &str) -> String {
    format!(
        "<html><head><meta charset='utf-8'><title>ADM paper suite report</title>\
         <style>body{{font-family:system-ui,Segoe UI,Roboto,Arial,sans-serif;max-width:1200px;margin:2rem auto;padding:0 1rem;}}\
         table{{border-collapse:collapse;width:100%;margin:1rem 0;}}th,td{{border:1px solid #d6d6d6;padding:0.4rem;text-align:left;}}th{{background:#f3f5f7;}}\
         code{{background:#f1f1f1;padding:0.1rem 0.25rem;}}</style></head><body><pre>{}</pre></body></html>",
        escape_html(markdown)
    )
}
