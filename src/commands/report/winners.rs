use tracing::debug;

use crate::model::InstanceKey;

use super::ordering::{Direction, KeyValue, SortKey, compare_by, deciding_key};
use super::stats::{GroupStats, group_by};

/// Winner order: success rate descending, then mean evaluations-to-target,
/// mean final best fitness and algorithm name ascending. Changing this
/// order changes published winners.
pub const WINNER_ORDER: [SortKey<GroupStats>; 4] = [
    SortKey {
        name: "success_rate",
        direction: Direction::Descending,
        extract: success_rate_key,
    },
    SortKey {
        name: "mean_evals_to_target",
        direction: Direction::Ascending,
        extract: mean_evals_key,
    },
    SortKey {
        name: "mean_final_best_fit",
        direction: Direction::Ascending,
        extract: mean_best_fit_key,
    },
    SortKey {
        name: "algorithm",
        direction: Direction::Ascending,
        extract: algorithm_key,
    },
];

fn success_rate_key(row: &GroupStats) -> KeyValue<'_> {
    KeyValue::Number(Some(row.summary.success_rate))
}

fn mean_evals_key(row: &GroupStats) -> KeyValue<'_> {
    KeyValue::Number(row.summary.mean_evals_to_target)
}

fn mean_best_fit_key(row: &GroupStats) -> KeyValue<'_> {
    KeyValue::Number(row.summary.mean_final_best_fit)
}

fn algorithm_key(row: &GroupStats) -> KeyValue<'_> {
    KeyValue::Text(&row.algorithm)
}

#[derive(Debug, Clone)]
pub struct WinnerRow {
    pub instance: InstanceKey,
    pub instance_key: String,
    pub algorithm: String,
    pub success_rate: f64,
    pub mean_evals_to_target: Option<f64>,
    pub mean_final_best_fit: Option<f64>,
}

/// Picks one winner per instance key, ordered by instance key.
pub fn select_winners(stats: &[GroupStats]) -> Vec<WinnerRow> {
    let per_instance = group_by(stats, |row| row.instance_key.clone());

    per_instance
        .into_values()
        .filter_map(|mut candidates| {
            candidates.sort_by(|left, right| compare_by(&WINNER_ORDER, *left, *right));
            let winner = *candidates.first()?;

            if let Some(runner_up) = candidates.get(1) {
                debug!(
                    instance = %winner.instance_key,
                    winner = %winner.algorithm,
                    runner_up = %runner_up.algorithm,
                    decided_by = deciding_key(&WINNER_ORDER, winner, *runner_up).unwrap_or("none"),
                    "selected instance winner"
                );
            }

            Some(WinnerRow {
                instance: winner.instance.clone(),
                instance_key: winner.instance_key.clone(),
                algorithm: winner.algorithm.clone(),
                success_rate: winner.summary.success_rate,
                mean_evals_to_target: winner.summary.mean_evals_to_target,
                mean_final_best_fit: winner.summary.mean_final_best_fit,
            })
        })
        .collect()
}
