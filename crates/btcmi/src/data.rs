//! OHLCV candle loading for research runs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

/// Columns every candle file must provide.
pub const REQUIRED_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

const NUMERIC_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("candle file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported file extension: '{0}'")]
    UnsupportedExtension(String),
    #[error("JSON candles must be an array of objects")]
    NotRecords,
    #[error("missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("column '{column}' contains null values (row {row})")]
    NullValue { column: String, row: usize },
    #[error("column '{column}' must be numeric (row {row})")]
    NonNumeric { column: String, row: usize },
    #[error("invalid timestamp '{value}' (row {row})")]
    Timestamp { value: String, row: usize },
}

/// Load candles from a `.csv` or `.json` file, validating every row.
pub fn load_ohlcv(path: &Path) -> Result<Vec<Candle>, DataError> {
    if !path.exists() {
        return Err(DataError::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        _ => Err(DataError::UnsupportedExtension(extension)),
    }
}

/// Closing prices in file order.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|candle| candle.close).collect()
}

fn load_csv(path: &Path) -> Result<Vec<Candle>, DataError> {
    let csv_error = |source| DataError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    let headers = reader.headers().map_err(csv_error)?.clone();
    let header_names: Vec<&str> = headers.iter().map(str::trim).collect();
    check_columns(|column| header_names.iter().any(|name| *name == column))?;

    let index_of = |column: &str| header_names.iter().position(|name| *name == column);
    let mut candles = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let cell = |column: &str| {
            index_of(column)
                .and_then(|index| record.get(index))
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| DataError::NullValue {
                    column: column.to_string(),
                    row,
                })
        };

        let timestamp = parse_timestamp(cell("timestamp")?, row)?;
        let mut numbers = [0.0; NUMERIC_COLUMNS.len()];
        for (slot, column) in numbers.iter_mut().zip(NUMERIC_COLUMNS) {
            *slot = cell(column)?
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| DataError::NonNumeric {
                    column: column.to_string(),
                    row,
                })?;
        }
        candles.push(candle(timestamp, numbers));
    }

    Ok(candles)
}

fn load_json(path: &Path) -> Result<Vec<Candle>, DataError> {
    let text = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Value = serde_json::from_str(&text).map_err(|source| DataError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let Value::Array(rows) = document else {
        return Err(DataError::NotRecords);
    };
    let records = rows
        .iter()
        .map(|row| row.as_object().ok_or(DataError::NotRecords))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(first) = records.first() {
        check_columns(|column| first.contains_key(column))?;
    }

    let mut candles = Vec::with_capacity(records.len());
    for (row, record) in records.into_iter().enumerate() {
        let field = |column: &str| match record.get(column) {
            None | Some(Value::Null) => Err(DataError::NullValue {
                column: column.to_string(),
                row,
            }),
            Some(value) => Ok(value),
        };

        let timestamp = match field("timestamp")? {
            Value::String(text) => parse_timestamp(text, row)?,
            Value::Number(number) => number
                .as_i64()
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
                .ok_or_else(|| DataError::Timestamp {
                    value: number.to_string(),
                    row,
                })?,
            other => {
                return Err(DataError::Timestamp {
                    value: other.to_string(),
                    row,
                })
            }
        };

        let mut numbers = [0.0; NUMERIC_COLUMNS.len()];
        for (slot, column) in numbers.iter_mut().zip(NUMERIC_COLUMNS) {
            *slot = crate::signal::as_number(field(column)?).ok_or_else(|| {
                DataError::NonNumeric {
                    column: column.to_string(),
                    row,
                }
            })?;
        }
        candles.push(candle(timestamp, numbers));
    }

    Ok(candles)
}

fn check_columns(has: impl Fn(&str) -> bool) -> Result<(), DataError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !has(**column))
        .map(|column| column.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DataError::MissingColumns(missing))
    }
}

/// RFC 3339, or a naive `YYYY-MM-DD[ HH:MM:SS]` read as UTC.
fn parse_timestamp(value: &str, row: usize) -> Result<DateTime<Utc>, DataError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Some(naive) = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc());
    }
    Err(DataError::Timestamp {
        value: value.to_string(),
        row,
    })
}

fn candle(timestamp: DateTime<Utc>, [open, high, low, close, volume]: [f64; 5]) -> Candle {
    Candle {
        timestamp,
        open,
        high,
        low,
        close,
        volume,
    }
}
