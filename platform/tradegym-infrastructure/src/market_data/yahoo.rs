use super::csv_file::range_bounds;
use super::record_load_metrics;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tradegym_domain::repositories::market_data::{MarketDataRepository, PriceQuery};
use tradegym_domain::services::prices::{canonicalize_closes, DataQualityReport};
use tradegym_domain::value_objects::price_point::PricePoint;

const USER_AGENT: &str = concat!("tradegym/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Daily closes from a Yahoo-style `/v8/finance/chart` endpoint.
pub struct YahooMarketDataRepository {
    base_url: String,
    timeout_ms: u64,
    client: Client,
}

impl YahooMarketDataRepository {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;
        Ok(Self {
            base_url: base_url.into(),
            timeout_ms,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fetch(&self, query: &PriceQuery) -> Result<(Vec<PricePoint>, DataQualityReport), String> {
        let (period1, period2) = range_bounds(query.start, query.end);
        let endpoint = format!(
            "{}/v8/finance/chart/{}",
            self.base_url.trim_end_matches('/'),
            query.symbol
        );
        let response = self
            .client
            .get(&endpoint)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .map_err(|err| format!("market data request failed: {err}"))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| format!("failed to read market data response: {err}"))?;
        // Unknown symbols come back as 404 with a chart.error payload.
        if !status.is_success() {
            if let Ok(parsed) = serde_json::from_str::<ChartEnvelope>(&body) {
                if let Some(err) = parsed.chart.error {
                    return Err(describe_chart_error(&query.symbol, &err));
                }
            }
            return Err(format!(
                "market data http error: status {}",
                status.as_u16()
            ));
        }

        let rows = parse_chart_response(&query.symbol, &body)?;
        let (start, end) = (period1, period2);
        let rows: Vec<(i64, Option<f64>)> = rows
            .into_iter()
            .filter(|(ts, _)| *ts >= start && *ts < end)
            .collect();
        Ok(canonicalize_closes(&rows))
    }
}

impl MarketDataRepository for YahooMarketDataRepository {
    fn load_prices(
        &self,
        query: &PriceQuery,
    ) -> Result<(Vec<PricePoint>, DataQualityReport), String> {
        let span = tracing::info_span!(
            "infra.market_data.yahoo",
            symbol = %query.symbol,
            base_url = %self.base_url,
            timeout_ms = self.timeout_ms
        );
        let _enter = span.enter();

        let start = Instant::now();
        let result = self.fetch(query);
        if let Err(err) = &result {
            tracing::warn!(error = %err, "market data request failed");
        }
        record_load_metrics("yahoo", start, &result);
        result
    }
}

fn describe_chart_error(symbol: &str, err: &ChartError) -> String {
    format!(
        "chart error for {}: {} ({})",
        symbol,
        err.description.as_deref().unwrap_or("unknown error"),
        err.code.as_deref().unwrap_or("no code")
    )
}

/// Extracts `(timestamp, close)` pairs from a chart payload. Null closes are
/// kept as `None` so they show up in the quality report.
fn parse_chart_response(symbol: &str, body: &str) -> Result<Vec<(i64, Option<f64>)>, String> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|err| format!("failed to parse chart response: {err}"))?;
    if let Some(err) = envelope.chart.error {
        return Err(describe_chart_error(symbol, &err));
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();
    if closes.len() != result.timestamp.len() {
        return Err(format!(
            "chart response for {} has {} timestamps but {} closes",
            symbol,
            result.timestamp.len(),
            closes.len()
        ));
    }

    Ok(result.timestamp.into_iter().zip(closes).collect())
}
