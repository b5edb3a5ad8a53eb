use crate::services::prices::DataQualityReport;
use crate::value_objects::price_point::PricePoint;
use chrono::NaiveDate;

/// Daily close prices for `symbol` in `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuery {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub trait MarketDataRepository: Send + Sync {
    fn load_prices(
        &self,
        query: &PriceQuery,
    ) -> Result<(Vec<PricePoint>, DataQualityReport), String>;
}
