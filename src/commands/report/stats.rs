use std::collections::BTreeMap;

use crate::model::{InstanceKey, ResolvedRun, RunRow, RunStatus, Variant};

use super::metadata::{MetadataTable, PairKey};

/// A run is solved when it completed with a best fitness at or below its
/// variant's target.
pub fn is_success(run: &RunRow) -> bool {
    if run.status != RunStatus::Completed {
        return false;
    }
    match run.best_fitness {
        Some(best) => best <= run.variant.target_fitness(),
        None => false,
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[middle])
    } else {
        Some((sorted[middle - 1] + sorted[middle]) / 2.0)
    }
}

/// Partitions `items` by `key`, keeping input order inside each group.
pub fn group_by<K, T, F>(items: impl IntoIterator<Item = T>, key: F) -> BTreeMap<K, Vec<T>>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut groups = BTreeMap::<K, Vec<T>>::new();
    for item in items {
        groups.entry(key(&item)).or_default().push(item);
    }
    groups
}

/// Statistics shared by per-instance and aggregate rows. `None` means the
/// statistic had no input values, which is distinct from a computed zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub runs: usize,
    pub success_rate: f64,
    pub mean_evals_to_target: Option<f64>,
    pub median_evals_to_target: Option<f64>,
    pub mean_final_best_fit: Option<f64>,
    pub median_final_best_fit: Option<f64>,
    pub mean_runtime_ms: Option<f64>,
}

impl RunSummary {
    pub fn from_runs<'a>(runs: impl IntoIterator<Item = &'a RunRow>) -> Self {
        let runs = runs.into_iter().collect::<Vec<&RunRow>>();
        let successes = runs
            .iter()
            .copied()
            .filter(|run| is_success(run))
            .collect::<Vec<&RunRow>>();

        let success_rate = if runs.is_empty() {
            0.0
        } else {
            successes.len() as f64 / runs.len() as f64
        };
        let evals_to_target = successes
            .iter()
            .filter_map(|run| run.evaluations)
            .map(|value| value as f64)
            .collect::<Vec<f64>>();
        let best_values = runs
            .iter()
            .filter_map(|run| run.best_fitness)
            .collect::<Vec<f64>>();
        let runtimes = runs
            .iter()
            .filter_map(|run| run.runtime_millis)
            .map(|value| value as f64)
            .collect::<Vec<f64>>();

        Self {
            runs: runs.len(),
            success_rate,
            mean_evals_to_target: mean(&evals_to_target),
            median_evals_to_target: median(&evals_to_target),
            mean_final_best_fit: mean(&best_values),
            median_final_best_fit: median(&best_values),
            mean_runtime_ms: mean(&runtimes),
        }
    }
}

/// One (instance, algorithm) row of the primary statistics table.
#[derive(Debug, Clone)]
pub struct GroupStats {
    pub instance: InstanceKey,
    pub instance_key: String,
    pub algorithm: String,
    pub summary: RunSummary,
    pub evaluation_mode: String,
    pub subset_count: Option<u64>,
    pub max_exact_subsets: Option<u64>,
    pub sample_size: Option<u64>,
}

/// Statistics over every run sharing (variant, t, algorithm).
#[derive(Debug, Clone)]
pub struct AggregateStats {
    pub variant: Variant,
    pub t: u32,
    pub algorithm: String,
    pub summary: RunSummary,
}

pub type RunGroups<'a> = BTreeMap<PairKey, Vec<ResolvedRun<'a>>>;

pub fn group_runs<'a>(runs: impl IntoIterator<Item = ResolvedRun<'a>>) -> RunGroups<'a> {
    group_by(runs, |resolved| {
        (resolved.instance.key(), resolved.run.algorithm.clone())
    })
}

pub fn build_group_stats(groups: &RunGroups<'_>, metadata: &MetadataTable) -> Vec<GroupStats> {
    groups
        .iter()
        .filter_map(|(pair, runs)| {
            let first = runs.first()?;
            let meta = metadata.get(pair);
            Some(GroupStats {
                instance: first.instance.clone(),
                instance_key: pair.0.clone(),
                algorithm: pair.1.clone(),
                summary: RunSummary::from_runs(runs.iter().map(|resolved| resolved.run)),
                evaluation_mode: meta
                    .map(|row| row.evaluation_mode.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                subset_count: meta.and_then(|row| row.subset_count),
                max_exact_subsets: meta.and_then(|row| row.max_exact_subsets),
                sample_size: meta.and_then(|row| row.sample_size),
            })
        })
        .collect()
}

pub fn build_aggregate_stats(groups: &RunGroups<'_>) -> Vec<AggregateStats> {
    let aggregated = group_by(groups.values().flatten(), |resolved| {
        (
            resolved.instance.variant,
            resolved.instance.t,
            resolved.run.algorithm.clone(),
        )
    });

    aggregated
        .into_iter()
        .map(|((variant, t, algorithm), runs)| AggregateStats {
            variant,
            t,
            algorithm,
            summary: RunSummary::from_runs(runs.into_iter().map(|resolved| resolved.run)),
        })
        .collect()
}
