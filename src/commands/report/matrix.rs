use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use rusqlite::Connection;
use serde_json::Value;

use crate::model::{ResolvedRun, RunRow};
use crate::util::write_text_file;

use super::ordering::{Direction, KeyValue, SortKey, compare_by};
use super::stats::GroupStats;
use super::store::load_completed_event_payload;

/// Best run: lowest final fitness, then fewest evaluations, unknown last.
const BEST_RUN_ORDER: [SortKey<RunRow>; 2] = [
    SortKey {
        name: "best_fitness",
        direction: Direction::Ascending,
        extract: best_fitness_key,
    },
    SortKey {
        name: "evaluations",
        direction: Direction::Ascending,
        extract: evaluations_key,
    },
];

fn best_fitness_key(run: &RunRow) -> KeyValue<'_> {
    KeyValue::Number(run.best_fitness)
}

fn evaluations_key(run: &RunRow) -> KeyValue<'_> {
    KeyValue::Number(run.evaluations.map(|value| value as f64))
}

/// Reasons a group ends up without a matrix artifact. None of them fail
/// the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSkip {
    NoFitness,
    NoCompletedEvent,
    MalformedPayload,
    InvalidEncoding,
    DimensionMismatch { expected: usize, actual: usize },
}

impl fmt::Display for ArtifactSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFitness => f.write_str("no run with a best fitness"),
            Self::NoCompletedEvent => f.write_str("no run_completed event"),
            Self::MalformedPayload => f.write_str("malformed run_completed payload"),
            Self::InvalidEncoding => f.write_str("bestGenotype is not a 0/1 string"),
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "genotype length {actual} != rows*cols {expected}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixOutcome {
    Written(PathBuf),
    Skipped(ArtifactSkip),
}

/// First run among the minima of [`BEST_RUN_ORDER`] that has a fitness.
pub fn select_best_run<'a>(runs: &[ResolvedRun<'a>]) -> Option<&'a RunRow> {
    runs.iter()
        .map(|resolved| resolved.run)
        .filter(|run| run.best_fitness.is_some())
        .min_by(|left, right| compare_by(&BEST_RUN_ORDER, *left, *right))
}

pub fn decode_best_genotype(payload_json: &str) -> Result<String, ArtifactSkip> {
    let payload: Value =
        serde_json::from_str(payload_json).map_err(|_| ArtifactSkip::MalformedPayload)?;
    let Some(genotype) = payload.get("bestGenotype") else {
        return Err(ArtifactSkip::InvalidEncoding);
    };
    let Some(genotype) = genotype.as_str() else {
        return Err(ArtifactSkip::InvalidEncoding);
    };
    if genotype.is_empty() || !genotype.chars().all(|ch| ch == '0' || ch == '1') {
        return Err(ArtifactSkip::InvalidEncoding);
    }
    Ok(genotype.to_string())
}

/// Renders a column-major 0/1 encoding as a row-major text matrix: the
/// symbol at flat index `col * rows + row` lands in cell (row, col).
pub fn render_matrix(genotype: &str, rows: usize, cols: usize) -> Result<String, ArtifactSkip> {
    let symbols = genotype.as_bytes();
    let expected = rows * cols;
    if symbols.len() != expected {
        return Err(ArtifactSkip::DimensionMismatch {
            expected,
            actual: symbols.len(),
        });
    }

    let mut lines = Vec::<String>::with_capacity(rows + 1);
    lines.push(format!("# rows={rows} cols={cols}"));
    for row in 0..rows {
        let line = (0..cols)
            .map(|col| char::from(symbols[col * rows + row]).to_string())
            .collect::<Vec<String>>()
            .join(" ");
        lines.push(line);
    }

    Ok(lines.join("\n") + "\n")
}

pub fn matrix_path(out_dir: &Path, group: &GroupStats) -> PathBuf {
    out_dir
        .join("best_matrices")
        .join(group.instance.variant.as_str())
        .join(&group.instance_key)
        .join(format!("{}.txt", group.algorithm))
}

/// Reconstructs the best run's matrix for one group. Only store and file
/// system failures are errors.
pub fn write_best_matrix(
    connection: &Connection,
    out_dir: &Path,
    group: &GroupStats,
    runs: &[ResolvedRun<'_>],
) -> Result<MatrixOutcome> {
    let Some(best_run) = select_best_run(runs) else {
        return Ok(MatrixOutcome::Skipped(ArtifactSkip::NoFitness));
    };
    let Some(payload) = load_completed_event_payload(connection, &best_run.run_id)? else {
        return Ok(MatrixOutcome::Skipped(ArtifactSkip::NoCompletedEvent));
    };

    let rendered = decode_best_genotype(&payload).and_then(|genotype| {
        render_matrix(
            &genotype,
            group.instance.m as usize,
            group.instance.n as usize,
        )
    });
    let text = match rendered {
        Ok(text) => text,
        Err(reason) => return Ok(MatrixOutcome::Skipped(reason)),
    };

    let path = matrix_path(out_dir, group);
    write_text_file(&path, &text)?;
    Ok(MatrixOutcome::Written(path))
}
