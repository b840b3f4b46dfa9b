use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde_json::Value;
use tracing::info;

use crate::model::{CAMPAIGN_RUN_PREFIX, InstanceKey, RunRow, RunStatus, Variant};

const LOAD_RUNS_SQL: &str = "
    SELECT
      r.run_id,
      r.experiment_id,
      r.status,
      r.best_fitness,
      r.evaluations,
      r.runtime_millis,
      e.algorithm_type,
      e.problem_type,
      e.config_json
    FROM runs r
    JOIN experiments e ON e.experiment_id = r.experiment_id
    WHERE r.run_id LIKE ?1
";

const LATEST_COMPLETED_EVENT_SQL: &str = "
    SELECT payload_json
    FROM events
    WHERE run_id = ?1 AND event_type = 'run_completed'
    ORDER BY id DESC
    LIMIT 1
";

/// Lookup order for each instance parameter: canonical name first, then
/// the legacy alias. Each name is tried on `problem` before `problem.params`.
const T_NAMES: [&str; 1] = ["t"];
const M_NAMES: [&str; 2] = ["m", "rows"];
const N_NAMES: [&str; 2] = ["n", "columns"];

pub fn open_store(db_path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open database read-only: {}", db_path.display()))
}

struct RawRunRecord {
    run_id: String,
    experiment_id: String,
    status: Option<String>,
    best_fitness: SqlValue,
    evaluations: SqlValue,
    runtime_millis: SqlValue,
    algorithm: String,
    problem_type: String,
    config_json: String,
}

/// Loads every campaign run joined with its experiment.
pub fn load_runs(connection: &Connection) -> Result<Vec<RunRow>> {
    let mut statement = connection
        .prepare(LOAD_RUNS_SQL)
        .context("failed to prepare run query")?;
    let pattern = format!("{CAMPAIGN_RUN_PREFIX}%");

    let records = statement
        .query_map(params![pattern], |row| {
            Ok(RawRunRecord {
                run_id: row.get(0)?,
                experiment_id: row.get(1)?,
                status: row.get(2)?,
                best_fitness: row.get(3)?,
                evaluations: row.get(4)?,
                runtime_millis: row.get(5)?,
                algorithm: row.get(6)?,
                problem_type: row.get(7)?,
                config_json: row.get(8)?,
            })
        })
        .context("failed to query runs")?;

    let mut runs = Vec::<RunRow>::new();
    for record in records {
        let record = record.context("failed to read run row")?;
        // LIKE is case-insensitive in SQLite; the prefix is not.
        if !record.run_id.starts_with(CAMPAIGN_RUN_PREFIX) {
            continue;
        }
        let run_id = record.run_id.clone();
        runs.push(normalize_run(record).with_context(|| format!("invalid run record {run_id}"))?);
    }

    info!(runs = runs.len(), "loaded campaign runs");
    Ok(runs)
}

fn normalize_run(record: RawRunRecord) -> Result<RunRow> {
    let config: Value = serde_json::from_str(&record.config_json).with_context(|| {
        format!(
            "malformed config_json for experiment {}",
            record.experiment_id
        )
    })?;
    let variant = Variant::from_problem_type(&record.problem_type)?;
    let instance = extract_instance(&config, variant)?;

    Ok(RunRow {
        run_id: record.run_id,
        experiment_id: record.experiment_id,
        algorithm: record.algorithm,
        problem_type: record.problem_type,
        status: RunStatus::parse(record.status.as_deref().unwrap_or("")),
        best_fitness: sql_to_f64(&record.best_fitness),
        evaluations: sql_to_i64(&record.evaluations),
        runtime_millis: sql_to_i64(&record.runtime_millis),
        config,
        variant,
        instance,
    })
}

/// Resolves (t, m, n) from a run configuration. Any parameter that is
/// absent or not positive leaves the instance unresolved.
pub fn extract_instance(config: &Value, variant: Variant) -> Result<Option<InstanceKey>> {
    let problem = config.get("problem").unwrap_or(&Value::Null);

    let t = instance_parameter(problem, &T_NAMES)?;
    let m = instance_parameter(problem, &M_NAMES)?;
    let n = instance_parameter(problem, &N_NAMES)?;

    Ok(match (t, m, n) {
        (Some(t), Some(m), Some(n)) => Some(InstanceKey { variant, t, m, n }),
        _ => None,
    })
}

fn instance_parameter(problem: &Value, names: &[&str]) -> Result<Option<u32>> {
    let params = problem.get("params").unwrap_or(&Value::Null);

    for name in names {
        for source in [problem, params] {
            let Some(value) = source.get(*name).filter(|value| !value.is_null()) else {
                continue;
            };
            let Some(parsed) = json_integer(value) else {
                bail!("problem parameter '{name}' is not an integer: {value}");
            };
            return Ok(u32::try_from(parsed).ok().filter(|value| *value > 0));
        }
    }

    Ok(None)
}

fn json_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.fract() == 0.0 && value.is_finite())
                .map(|value| value as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn sql_to_f64(value: &SqlValue) -> Option<f64> {
    match value {
        SqlValue::Integer(number) => Some(*number as f64),
        SqlValue::Real(number) => Some(*number),
        SqlValue::Text(text) => text.trim().parse::<f64>().ok(),
        SqlValue::Null | SqlValue::Blob(_) => None,
    }
}

fn sql_to_i64(value: &SqlValue) -> Option<i64> {
    match value {
        SqlValue::Integer(number) => Some(*number),
        SqlValue::Real(number) if number.is_finite() => Some(*number as i64),
        SqlValue::Text(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Payload of the most recent `run_completed` event for `run_id`, if any.
pub fn load_completed_event_payload(
    connection: &Connection,
    run_id: &str,
) -> Result<Option<String>> {
    connection
        .query_row(LATEST_COMPLETED_EVENT_SQL, params![run_id], |row| {
            row.get::<_, Option<String>>(0)
        })
        .optional()
        .with_context(|| format!("failed to query run_completed event for {run_id}"))
        .map(Option::flatten)
}
