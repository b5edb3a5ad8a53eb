use serde::{Deserialize, Serialize};

/// Fixed-size state vector handed to a policy:
/// `[cash_balance, price_at(current_step), shares_held]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub values: [f64; 3],
}

impl Observation {
    pub const LEN: usize = 3;

    pub fn new(cash_balance: f64, price: f64, shares_held: u64) -> Self {
        Self {
            values: [cash_balance, price, shares_held as f64],
        }
    }

    pub fn cash_balance(&self) -> f64 {
        self.values[0]
    }

    pub fn price(&self) -> f64 {
        self.values[1]
    }

    pub fn shares_held(&self) -> f64 {
        self.values[2]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}
