//! Readers for raw movie rows: the CSV metadata export, or JSON Lines.

use super::literal::{name, names, parse_literal};
use super::record::MovieRecord;
use marquee_core::{AppError, AppResult};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// A row that could not be turned into a record.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// 1-based line number
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct Dataset {
    pub records: Vec<MovieRecord>,
    pub skipped: Vec<SkippedRow>,
    /// Rows dropped by the budget filter
    pub filtered: usize,
}

impl Dataset {
    fn push(&mut self, line: usize, record: Result<MovieRecord, String>, min_budget: f64) {
        match record {
            Ok(record) if record.budget > min_budget => self.records.push(record),
            Ok(_) => self.filtered += 1,
            Err(reason) => {
                tracing::debug!(line, %reason, "Skipping movie row");
                self.skipped.push(SkippedRow { line, reason });
            }
        }
    }
}

/// Raw row as exported from the movie metadata table. Numeric columns may
/// arrive as numbers or numeric strings; structured columns as Python reprs.
#[derive(Debug, Deserialize)]
struct RawMovieRow {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    original_title: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    genres: Value,
    #[serde(default)]
    belongs_to_collection: Value,
    #[serde(default)]
    budget: Value,
    #[serde(default)]
    popularity: Value,
    #[serde(default)]
    revenue: Value,
    #[serde(default)]
    runtime: Value,
    #[serde(default)]
    vote_average: Value,
    #[serde(default)]
    vote_count: Value,
}

/// Read `path` and keep movies with a budget above `min_budget`.
///
/// A `.csv` file is read as the metadata export with a header row; anything
/// else as JSON Lines.
pub fn load_movies(path: &Path, min_budget: f64) -> AppResult<Dataset> {
    let file = File::open(path)
        .map_err(|e| AppError::Dataset(format!("Failed to open {:?}: {}", path, e)))?;
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let dataset = if is_csv {
        parse_movies_csv(BufReader::new(file), min_budget)?
    } else {
        parse_movies(BufReader::new(file), min_budget)?
    };

    tracing::info!(
        path = ?path,
        records = dataset.records.len(),
        skipped = dataset.skipped.len(),
        filtered = dataset.filtered,
        "Loaded movie dataset"
    );
    Ok(dataset)
}

/// Parse JSON Lines from `reader`. Malformed rows are skipped and reported;
/// only read failures are errors.
pub fn parse_movies(reader: impl BufRead, min_budget: f64) -> AppResult<Dataset> {
    let mut dataset = Dataset::default();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record = serde_json::from_str::<RawMovieRow>(&line)
            .map_err(|e| format!("invalid JSON: {}", e))
            .and_then(|raw| normalize(raw, line_no));
        dataset.push(line_no, record, min_budget);
    }

    Ok(dataset)
}

/// Parse CSV with a header row from `reader`. Columns are matched by name,
/// unknown ones ignored. Quoted fields may span lines; rows are reported by
/// the line they start on.
pub fn parse_movies_csv(reader: impl Read, min_budget: f64) -> AppResult<Dataset> {
    let mut rows = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rows
        .headers()
        .map_err(|e| AppError::Dataset(format!("Failed to read CSV header: {}", e)))?
        .clone();

    let mut dataset = Dataset::default();
    let mut last_line = 1;

    for row in rows.records() {
        let (line, record) = match row {
            Ok(row) => {
                let line = row.position().map_or(last_line + 1, |p| p.line() as usize);
                let record = row
                    .deserialize::<RawMovieRow>(Some(&headers))
                    .map_err(|e| format!("invalid CSV row: {}", e))
                    .and_then(|raw| normalize(raw, line));
                (line, record)
            }
            Err(e) if e.is_io_error() => {
                return Err(AppError::Dataset(format!("Failed to read CSV: {}", e)));
            }
            Err(e) => {
                let line = e.position().map_or(last_line + 1, |p| p.line() as usize);
                (line, Err(format!("invalid CSV row: {}", e)))
            }
        };
        last_line = line;
        dataset.push(line, record, min_budget);
    }

    Ok(dataset)
}

fn normalize(raw: RawMovieRow, line: usize) -> Result<MovieRecord, String> {
    let title = raw
        .original_title
        .or(raw.title)
        .filter(|t| !t.trim().is_empty())
        .ok_or("missing title")?;
    let overview = raw
        .overview
        .filter(|o| !o.trim().is_empty())
        .ok_or("missing overview")?;

    let id = match raw.id {
        Value::String(s) if !s.trim().is_empty() => s,
        Value::Number(n) => n.to_string(),
        _ => line.to_string(),
    };

    Ok(MovieRecord {
        id,
        title,
        overview,
        genres: structured(&raw.genres, "genres").map(|v| names(&v))?,
        collection: structured(&raw.belongs_to_collection, "belongs_to_collection")
            .map(|v| name(&v))?,
        budget: required_number(&raw.budget, "budget")?,
        popularity: number(&raw.popularity, "popularity")?.unwrap_or(0.0),
        revenue: number(&raw.revenue, "revenue")?.unwrap_or(0.0),
        runtime: number(&raw.runtime, "runtime")?.unwrap_or(0.0),
        vote_average: number(&raw.vote_average, "vote_average")?.unwrap_or(0.0),
        vote_count: number(&raw.vote_count, "vote_count")?.unwrap_or(0.0),
    })
}

/// A structured column: Python repr string, inline JSON, or null.
fn structured(value: &Value, field: &str) -> Result<Value, String> {
    match value {
        Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
        Value::String(s) => parse_literal(s).map_err(|e| format!("{}: {}", field, e)),
        other => Ok(other.clone()),
    }
}

fn number(value: &Value, field: &str) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("{}: '{}' is not a number", field, s)),
        other => Err(format!("{}: unexpected value {}", field, other)),
    }
}

fn required_number(value: &Value, field: &str) -> Result<f64, String> {
    number(value, field)?.ok_or_else(|| format!("missing {}", field))
}
