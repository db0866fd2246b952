use serde::{Deserialize, Serialize};

/// One trip as supplied by a dataset or a caller, before validation.
///
/// `expected_output` is only present on labeled cases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub trip_duration_days: i64,
    pub miles_traveled: f64,
    pub total_receipts_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<f64>,
}

impl TripRecord {
    pub fn new(trip_duration_days: i64, miles_traveled: f64, total_receipts_amount: f64) -> Self {
        Self {
            trip_duration_days,
            miles_traveled,
            total_receipts_amount,
            expected_output: None,
        }
    }

    pub fn labeled(mut self, expected_output: f64) -> Self {
        self.expected_output = Some(expected_output);
        self
    }

    pub fn input(&self) -> Result<TripInput, ScoringError> {
        TripInput::new(
            self.trip_duration_days,
            self.miles_traveled,
            self.total_receipts_amount,
        )
    }
}

/// Validated scorer input: `days > 0`, miles and receipts finite and non-negative.
///
/// Every positive `i64` duration is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TripInput {
    days: u64,
    miles: f64,
    receipts: f64,
}

impl TripInput {
    pub fn new(days: i64, miles: f64, receipts: f64) -> Result<Self, ScoringError> {
        if days <= 0 {
            return Err(ScoringError::InvalidInput {
                field: "trip_duration_days",
                reason: format!("must be a positive integer, got {days}"),
            });
        }
        let days = days.unsigned_abs();
        check_amount("miles_traveled", miles)?;
        check_amount("total_receipts_amount", receipts)?;

        Ok(Self {
            days,
            miles,
            receipts,
        })
    }

    pub fn days(&self) -> u64 {
        self.days
    }

    pub fn miles(&self) -> f64 {
        self.miles
    }

    pub fn receipts(&self) -> f64 {
        self.receipts
    }
}

fn check_amount(field: &'static str, value: f64) -> Result<(), ScoringError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ScoringError::InvalidInput {
            field,
            reason: format!("must be a finite, non-negative number, got {value}"),
        });
    }
    Ok(())
}

/// Failures scoped to a single scoring call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("invalid input for {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
    #[error("scoring produced a non-finite amount at stage {stage}")]
    Computation { stage: &'static str },
}
