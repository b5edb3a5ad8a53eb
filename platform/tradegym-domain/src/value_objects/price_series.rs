use crate::errors::SimulationError;
use crate::value_objects::price_point::PricePoint;

/// Ordered, immutable close prices, one per discrete time step.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    prices: Vec<f64>,
}

impl PriceSeries {
    /// Every price must be finite and non-negative.
    pub fn new(prices: Vec<f64>) -> Result<Self, SimulationError> {
        if let Some((index, value)) = prices
            .iter()
            .copied()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || *p < 0.0)
        {
            return Err(SimulationError::InvalidPrice { index, value });
        }
        Ok(Self { prices })
    }

    pub fn from_points(points: &[PricePoint]) -> Result<Self, SimulationError> {
        Self::new(points.iter().map(|p| p.close).collect())
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Price at `index`, clamped to the last entry. Callers must not use this
    /// on an empty series.
    pub fn price_at_or_last(&self, index: usize) -> f64 {
        let last = self.prices.len().saturating_sub(1);
        self.prices[index.min(last)]
    }
}
