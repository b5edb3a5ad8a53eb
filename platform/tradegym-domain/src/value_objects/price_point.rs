use serde::{Deserialize, Serialize};

/// A single close price as delivered by a market data source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Unix seconds (UTC).
    pub timestamp: i64,
    pub close: f64,
}
