use serde::{Deserialize, Serialize};

/// Progressive bracket total: each rate applies only to the marginal amount
/// inside its band, and an amount sitting exactly on a breakpoint belongs to
/// the lower band.
///
/// `rates` must hold one more entry than `breakpoints`. Non-increasing
/// breakpoints yield empty bands rather than negative contributions.
pub fn progressive_total(amount: f64, breakpoints: &[f64], rates: &[f64]) -> f64 {
    let mut total = 0.0;
    let mut floor = 0.0;

    for (index, rate) in rates.iter().enumerate() {
        if amount <= floor {
            break;
        }
        let ceiling = breakpoints.get(index).copied().unwrap_or(f64::INFINITY);
        let band = amount.min(ceiling) - floor;
        if band > 0.0 {
            total += band * rate;
        }
        floor = floor.max(ceiling);
    }

    total
}

/// Two breakpoints, three marginal rates over miles driven.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MileageTiers {
    pub breakpoints: [f64; 2],
    pub rates: [f64; 3],
}

impl MileageTiers {
    pub fn reimbursement(&self, miles: f64) -> f64 {
        progressive_total(miles, &self.breakpoints, &self.rates)
    }
}

/// Three breakpoints, four marginal rates over the receipts total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReceiptTiers {
    pub breakpoints: [f64; 3],
    pub rates: [f64; 4],
}

impl ReceiptTiers {
    pub fn reimbursement(&self, receipts: f64) -> f64 {
        progressive_total(receipts, &self.breakpoints, &self.rates)
    }
}

pub(crate) fn strictly_increasing(values: &[f64]) -> bool {
    values.iter().all(|value| value.is_finite() && *value > 0.0)
        && values.windows(2).all(|pair| pair[0] < pair[1])
}
