use super::DatasetError;
use crate::model::{Scorer, ScoringError, TripRecord};
use std::io::Write;
use tracing::{info, warn};

/// Output line for a row that could not be scored.
pub const ERROR_SENTINEL: &str = "ERROR";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BatchSummary {
    pub rows: usize,
    pub scored: usize,
    pub failed: usize,
}

/// Scores every row in order; a failing row never stops the batch.
pub fn score_batch(
    scorer: &Scorer,
    rows: &[Result<TripRecord, ScoringError>],
) -> Vec<Result<f64, ScoringError>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let result = row
                .as_ref()
                .map_err(Clone::clone)
                .and_then(|record| scorer.predict_record(record))
                .map(|prediction| prediction.amount);
            if let Err(err) = &result {
                warn!(row = index + 1, error = %err, "row could not be scored");
            }
            result
        })
        .collect()
}

/// Writes one line per result, amounts with two decimals.
pub fn write_batch<W: Write>(
    mut writer: W,
    results: &[Result<f64, ScoringError>],
) -> Result<BatchSummary, DatasetError> {
    let mut summary = BatchSummary::default();
    for result in results {
        summary.rows += 1;
        match result {
            Ok(amount) => {
                summary.scored += 1;
                writeln!(writer, "{amount:.2}")?;
            }
            Err(_) => {
                summary.failed += 1;
                writeln!(writer, "{ERROR_SENTINEL}")?;
            }
        }
    }
    writer.flush()?;

    info!(
        rows = summary.rows,
        scored = summary.scored,
        failed = summary.failed,
        "batch written"
    );
    Ok(summary)
}
