use super::DatasetError;
use crate::model::{ScoringError, TripRecord};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::io::Read;

/// Case as stored on disk: either nested under `input` or flat.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CaseEntry {
    Nested {
        input: TripFields,
        #[serde(default)]
        expected_output: Option<f64>,
    },
    Flat(TripRecord),
}

#[derive(Debug, Deserialize)]
struct TripFields {
    trip_duration_days: i64,
    miles_traveled: f64,
    total_receipts_amount: f64,
}

impl From<CaseEntry> for TripRecord {
    fn from(entry: CaseEntry) -> Self {
        match entry {
            CaseEntry::Nested {
                input,
                expected_output,
            } => TripRecord {
                trip_duration_days: input.trip_duration_days,
                miles_traveled: input.miles_traveled,
                total_receipts_amount: input.total_receipts_amount,
                expected_output,
            },
            CaseEntry::Flat(record) => record,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    trip_duration_days: i64,
    miles_traveled: f64,
    total_receipts_amount: f64,
    #[serde(default, deserialize_with = "empty_as_none")]
    expected_output: Option<f64>,
}

impl From<CsvRow> for TripRecord {
    fn from(row: CsvRow) -> Self {
        TripRecord {
            trip_duration_days: row.trip_duration_days,
            miles_traveled: row.miles_traveled,
            total_receipts_amount: row.total_receipts_amount,
            expected_output: row.expected_output,
        }
    }
}

pub(crate) fn parse_json_cases<R: Read>(reader: R) -> Result<Vec<TripRecord>, DatasetError> {
    let entries: Vec<CaseEntry> = serde_json::from_reader(reader)?;
    Ok(entries.into_iter().map(TripRecord::from).collect())
}

pub(crate) fn parse_csv_cases<R: Read>(reader: R) -> Result<Vec<TripRecord>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for row in csv_reader.deserialize::<CsvRow>() {
        records.push(row?.into());
    }

    Ok(records)
}

/// Parses each JSON array element on its own so one bad element fails only
/// its own row.
pub(crate) fn parse_json_rows<R: Read>(
    reader: R,
) -> Result<Vec<Result<TripRecord, ScoringError>>, DatasetError> {
    let values: Vec<Value> = serde_json::from_reader(reader)?;
    Ok(values
        .into_iter()
        .map(|value| {
            serde_json::from_value::<CaseEntry>(value)
                .map(TripRecord::from)
                .map_err(|err| malformed(err.to_string()))
        })
        .collect())
}

/// Reads rows leniently: a row that does not parse becomes an error entry.
///
/// The first line is a header only when none of its first three fields is
/// numeric, so headerless input and a malformed first data row both keep
/// their line.
pub(crate) fn parse_csv_rows<R: Read>(
    reader: R,
) -> Result<Vec<Result<TripRecord, ScoringError>>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut rows = Vec::new();

    for (index, record) in csv_reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                rows.push(Err(malformed(err.to_string())));
                continue;
            }
        };
        if index == 0 && is_header(&record) {
            continue;
        }
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(row_from_fields(&record));
    }

    Ok(rows)
}

fn is_header(record: &csv::StringRecord) -> bool {
    record
        .iter()
        .take(3)
        .all(|field| !field.is_empty() && field.parse::<f64>().is_err())
}

fn row_from_fields(record: &csv::StringRecord) -> Result<TripRecord, ScoringError> {
    if record.len() < 3 {
        return Err(malformed(format!(
            "expected 3 columns, found {}",
            record.len()
        )));
    }

    let days = parse_field::<i64>(record, 0, "trip_duration_days")?;
    let miles = parse_field::<f64>(record, 1, "miles_traveled")?;
    let receipts = parse_field::<f64>(record, 2, "total_receipts_amount")?;
    Ok(TripRecord::new(days, miles, receipts))
}

fn parse_field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    position: usize,
    field: &'static str,
) -> Result<T, ScoringError> {
    let raw = record.get(position).unwrap_or_default();
    raw.parse::<T>().map_err(|_| ScoringError::InvalidInput {
        field,
        reason: format!("'{raw}' is not a number"),
    })
}

fn malformed(reason: String) -> ScoringError {
    ScoringError::InvalidInput {
        field: "record",
        reason,
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
