use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::model::{MetadataRow, Variant};

/// (instance key, algorithm)
pub type PairKey = (String, String);
pub type MetadataTable = BTreeMap<PairKey, MetadataRow>;

const REQUIRED_COLUMNS: [&str; 7] = [
    "instance_key",
    "algorithm",
    "variant",
    "t",
    "m",
    "n",
    "mandatory",
];

pub fn load_metadata(path: &Path, include_optional: bool) -> Result<MetadataTable> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read metadata table: {}", path.display()))?;
    let table = parse_metadata(&raw, include_optional)
        .with_context(|| format!("failed to parse metadata table: {}", path.display()))?;

    info!(
        path = %path.display(),
        rows = table.len(),
        include_optional,
        "loaded metadata table"
    );
    Ok(table)
}

/// Parses the metadata CSV. Rows not flagged mandatory are dropped unless
/// `include_optional` is set; a repeated pair keeps its last row.
pub fn parse_metadata(raw: &str, include_optional: bool) -> Result<MetadataTable> {
    let mut records = parse_csv_records(raw.trim_start_matches('\u{feff}')).into_iter();
    let Some(header) = records.next() else {
        bail!("metadata table has no header row");
    };
    let columns = ColumnIndex::new(&header)?;

    let mut table = MetadataTable::new();
    for (index, cells) in records.enumerate() {
        let row = columns
            .parse_row(&cells)
            .with_context(|| format!("invalid metadata data row {}", index + 1))?;
        if !include_optional && !row.mandatory {
            continue;
        }
        table.insert((row.instance_key.clone(), row.algorithm.clone()), row);
    }

    Ok(table)
}

struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    fn new(header: &[String]) -> Result<Self> {
        let positions = header
            .iter()
            .enumerate()
            .map(|(index, name)| (name.trim().to_string(), index))
            .collect::<HashMap<String, usize>>();

        for column in REQUIRED_COLUMNS {
            if !positions.contains_key(column) {
                bail!("metadata header is missing required column '{column}'");
            }
        }

        Ok(Self { positions })
    }

    fn cell<'a>(&self, cells: &'a [String], column: &str) -> Option<&'a str> {
        self.positions
            .get(column)
            .map(|index| cells.get(*index).map(|value| value.trim()).unwrap_or(""))
    }

    fn required<'a>(&self, cells: &'a [String], column: &str) -> &'a str {
        self.cell(cells, column).unwrap_or("")
    }

    fn required_u32(&self, cells: &[String], column: &str) -> Result<u32> {
        let value = self.required(cells, column);
        value
            .parse::<u32>()
            .with_context(|| format!("column '{column}' is not a non-negative integer: '{value}'"))
    }

    fn optional_u64(&self, cells: &[String], column: &str) -> Option<u64> {
        self.cell(cells, column)
            .and_then(|value| value.parse::<u64>().ok())
    }

    fn parse_row(&self, cells: &[String]) -> Result<MetadataRow> {
        Ok(MetadataRow {
            instance_key: self.required(cells, "instance_key").to_string(),
            algorithm: self.required(cells, "algorithm").to_string(),
            variant: Variant::from_code(self.required(cells, "variant"))?,
            t: self.required_u32(cells, "t")?,
            m: self.required_u32(cells, "m")?,
            n: self.required_u32(cells, "n")?,
            mandatory: self.required(cells, "mandatory") == "true",
            evaluation_mode: self
                .cell(cells, "evaluation_mode")
                .unwrap_or("unknown")
                .to_string(),
            subset_count: self.optional_u64(cells, "subset_count"),
            max_exact_subsets: self.optional_u64(cells, "max_exact_subsets"),
            sample_size: self.optional_u64(cells, "sample_size"),
        })
    }
}

/// Splits CSV text into records. Quoted cells may hold separators, doubled
/// quotes and line breaks; blank lines are skipped.
pub(super) fn parse_csv_records(raw: &str) -> Vec<Vec<String>> {
    let mut records = Vec::<Vec<String>>::new();
    let mut cells = Vec::<String>::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => cells.push(std::mem::take(&mut current)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                cells.push(std::mem::take(&mut current));
                push_record(&mut records, std::mem::take(&mut cells));
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() || !cells.is_empty() {
        cells.push(current);
        push_record(&mut records, cells);
    }

    records
}

fn push_record(records: &mut Vec<Vec<String>>, cells: Vec<String>) {
    let blank = matches!(cells.as_slice(), [only] if only.trim().is_empty());
    if !blank {
        records.push(cells);
    }
}
