//! Moving trips in and out of files.
//!
//! Labeled cases load strictly: one malformed row fails the whole load.
//! Batch rows load leniently so a bad row only costs its own output line.

mod batch;
mod parser;

pub use batch::{score_batch, write_batch, BatchSummary, ERROR_SENTINEL};

use crate::model::{ScoringError, TripRecord};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Json,
    Csv,
}

impl DatasetFormat {
    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Ok(Self::Json),
            "csv" | "txt" => Ok(Self::Csv),
            _ => Err(DatasetError::UnsupportedFormat { extension }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to open dataset {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to write batch output: {0}")]
    Write(#[from] io::Error),
    #[error("invalid JSON dataset: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid CSV dataset: {0}")]
    Csv(#[from] csv::Error),
    #[error("unsupported dataset extension '{extension}', expected json or csv")]
    UnsupportedFormat { extension: String },
    #[error("case {index} has no expected_output")]
    MissingLabel { index: usize },
}

fn open(path: &Path) -> Result<BufReader<File>, DatasetError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| DatasetError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Loads cases; labels are optional.
pub fn load_cases<P: AsRef<Path>>(path: P) -> Result<Vec<TripRecord>, DatasetError> {
    let path = path.as_ref();
    let records = match DatasetFormat::from_path(path)? {
        DatasetFormat::Json => parser::parse_json_cases(open(path)?)?,
        DatasetFormat::Csv => parser::parse_csv_cases(open(path)?)?,
    };
    tracing::debug!(path = %path.display(), cases = records.len(), "loaded cases");
    Ok(records)
}

/// Loads cases and requires every one to carry an expected output.
pub fn load_labeled_cases<P: AsRef<Path>>(path: P) -> Result<Vec<TripRecord>, DatasetError> {
    let records = load_cases(path)?;
    if let Some(index) = records
        .iter()
        .position(|record| record.expected_output.is_none())
    {
        return Err(DatasetError::MissingLabel { index });
    }
    Ok(records)
}

/// Loads batch input, keeping unparseable rows as per-row errors.
pub fn load_batch_rows<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<Result<TripRecord, ScoringError>>, DatasetError> {
    let path = path.as_ref();
    match DatasetFormat::from_path(path)? {
        DatasetFormat::Json => parser::parse_json_rows(open(path)?),
        DatasetFormat::Csv => parser::parse_csv_rows(open(path)?),
    }
}
