use serde::{Deserialize, Serialize};

/// Mutable single-asset portfolio owned by the trading environment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub cash_balance: f64,
    pub shares_held: u64,
    pub current_step: usize,
}

impl PortfolioState {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            cash_balance: initial_balance,
            shares_held: 0,
            current_step: 0,
        }
    }

    pub fn net_worth(&self, price: f64) -> f64 {
        self.cash_balance + self.shares_held as f64 * price
    }

    /// Buys one share. Returns false (and leaves state untouched) when cash
    /// does not cover the price.
    pub fn try_buy(&mut self, price: f64) -> bool {
        if self.cash_balance < price {
            return false;
        }
        self.shares_held += 1;
        self.cash_balance -= price;
        true
    }

    /// Sells one share. Returns false (and leaves state untouched) when no
    /// shares are held.
    pub fn try_sell(&mut self, price: f64) -> bool {
        if self.shares_held == 0 {
            return false;
        }
        self.shares_held -= 1;
        self.cash_balance += price;
        true
    }
}
