use super::record_load_metrics;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;
use tradegym_domain::repositories::market_data::{MarketDataRepository, PriceQuery};
use tradegym_domain::services::prices::{canonicalize_closes, DataQualityReport};
use tradegym_domain::value_objects::price_point::PricePoint;

const TIMESTAMP_COLUMNS: [&str; 4] = ["date", "timestamp_utc", "timestamp", "datetime"];
const CLOSE_COLUMNS: [&str; 2] = ["close", "adj_close"];

/// Close prices from a CSV file. A `{symbol}` placeholder in the path is
/// replaced with the requested ticker.
#[derive(Debug, Clone)]
pub struct CsvMarketDataRepository {
    path_template: String,
}

impl CsvMarketDataRepository {
    pub fn new(path_template: impl Into<String>) -> Self {
        Self {
            path_template: path_template.into(),
        }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        PathBuf::from(self.path_template.replace("{symbol}", symbol))
    }

    fn load(&self, query: &PriceQuery) -> Result<(Vec<PricePoint>, DataQualityReport), String> {
        let path = self.path_for(&query.symbol);
        let file = File::open(&path)
            .map_err(|err| format!("failed to open price CSV {}: {}", path.display(), err))?;
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

        let headers = reader
            .headers()
            .map_err(|err| format!("failed to read CSV header {}: {}", path.display(), err))?
            .clone();
        let ts_idx = find_column(&headers, &TIMESTAMP_COLUMNS).ok_or_else(|| {
            format!(
                "price CSV {} has no timestamp column (expected one of: {})",
                path.display(),
                TIMESTAMP_COLUMNS.join(", ")
            )
        })?;
        let close_idx = find_column(&headers, &CLOSE_COLUMNS).ok_or_else(|| {
            format!(
                "price CSV {} has no close column (expected one of: {})",
                path.display(),
                CLOSE_COLUMNS.join(", ")
            )
        })?;

        let (range_start, range_end) = range_bounds(query.start, query.end);
        let mut rows: Vec<(i64, Option<f64>)> = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let record = result.map_err(|err| format!("failed to parse CSV row: {}", err))?;
            let raw_ts = record.get(ts_idx).unwrap_or("");
            let timestamp = parse_timestamp(raw_ts)
                .map_err(|err| format!("row {}: {}", line + 2, err))?;
            if timestamp < range_start || timestamp >= range_end {
                continue;
            }

            let raw_close = record.get(close_idx).unwrap_or("");
            let close = if raw_close.is_empty() || raw_close.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(raw_close.parse::<f64>().map_err(|err| {
                    format!("row {}: invalid close {:?}: {}", line + 2, raw_close, err)
                })?)
            };
            rows.push((timestamp, close));
        }

        Ok(canonicalize_closes(&rows))
    }
}

impl MarketDataRepository for CsvMarketDataRepository {
    fn load_prices(
        &self,
        query: &PriceQuery,
    ) -> Result<(Vec<PricePoint>, DataQualityReport), String> {
        let span = tracing::info_span!(
            "infra.market_data.csv",
            symbol = %query.symbol,
            path = %self.path_for(&query.symbol).display()
        );
        let _enter = span.enter();

        let start = Instant::now();
        let result = self.load(query);
        record_load_metrics("csv", start, &result);
        result
    }
}

fn find_column(headers: &csv::StringRecord, candidates: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let normalized = h.trim().to_lowercase().replace(' ', "_");
        candidates.iter().any(|c| *c == normalized)
    })
}

/// `[start, end)` as unix seconds at UTC midnight.
pub(crate) fn range_bounds(start: NaiveDate, end: NaiveDate) -> (i64, i64) {
    let to_ts = |date: NaiveDate| {
        date.and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive).timestamp())
            .unwrap_or(0)
    };
    (to_ts(start), to_ts(end))
}

fn parse_timestamp(value: &str) -> Result<i64, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%z") {
        return Ok(dt.timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive).timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive).timestamp());
        }
    }
    if let Ok(epoch) = value.parse::<i64>() {
        return Ok(epoch);
    }

    Err(format!("unsupported timestamp format: {}", value))
}
