//! CSV exports of company profiles turned into batch scoring entries.

use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::warn;

use crate::scoring::{BatchEntry, FeatureSet};

const IDENTIFIER_COLUMN: &str = "cuit";

#[derive(Debug)]
pub enum BatchImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingIdentifierColumn,
}

impl std::fmt::Display for BatchImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchImportError::Io(err) => write!(f, "failed to read batch file: {}", err),
            BatchImportError::Csv(err) => write!(f, "invalid batch CSV data: {}", err),
            BatchImportError::MissingIdentifierColumn => {
                write!(f, "batch CSV has no '{IDENTIFIER_COLUMN}' column")
            }
        }
    }
}

impl std::error::Error for BatchImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BatchImportError::Io(err) => Some(err),
            BatchImportError::Csv(err) => Some(err),
            BatchImportError::MissingIdentifierColumn => None,
        }
    }
}

impl From<std::io::Error> for BatchImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for BatchImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Why a single row could not be turned into features.
#[derive(Debug, thiserror::Error)]
enum RowDefect {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("column '{column}' holds '{value}', expected a number")]
    NotANumber { column: String, value: String },
}

pub fn read_batch_file<P: AsRef<Path>>(path: P) -> Result<Vec<BatchEntry>, BatchImportError> {
    let file = std::fs::File::open(path)?;
    read_batch(file)
}

/// Every column other than `cuit` is read as a feature and blank cells are
/// left out of the feature set. A row that cannot be read is kept as a
/// malformed entry so scoring reports it as skipped. Identifiers are passed
/// through unvalidated.
///
/// Only a missing `cuit` header or a failing reader aborts the import.
pub fn read_batch<R: Read>(reader: R) -> Result<Vec<BatchEntry>, BatchImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let identifier_index = headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(IDENTIFIER_COLUMN))
        .ok_or(BatchImportError::MissingIdentifierColumn)?;

    let mut entries = Vec::new();
    for record in csv_reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                let line = err.position().map(|pos| pos.line()).unwrap_or_default();
                warn!(line, error = %err, "unreadable batch row skipped");
                entries.push(BatchEntry::malformed("", format!("line {line}: {err}")));
                continue;
            }
        };
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        let identifier = record.get(identifier_index).unwrap_or_default();

        match read_features(&headers, &record, identifier_index) {
            Ok(features) => entries.push(BatchEntry::new(identifier, features)),
            Err(defect) => {
                warn!(line, identifier, error = %defect, "malformed batch row skipped");
                entries.push(BatchEntry::malformed(
                    identifier,
                    format!("line {line}: {defect}"),
                ));
            }
        }
    }

    Ok(entries)
}

fn read_features(
    headers: &StringRecord,
    record: &StringRecord,
    identifier_index: usize,
) -> Result<FeatureSet, RowDefect> {
    if record.len() != headers.len() {
        return Err(RowDefect::FieldCount {
            expected: headers.len(),
            found: record.len(),
        });
    }

    let mut features = FeatureSet::new();
    for (index, (column, value)) in headers.iter().zip(record.iter()).enumerate() {
        if index == identifier_index || value.is_empty() {
            continue;
        }

        let parsed = value.parse::<f64>().map_err(|_| RowDefect::NotANumber {
            column: column.to_string(),
            value: value.to_string(),
        })?;
        features.insert(column, parsed);
    }
    Ok(features)
}
