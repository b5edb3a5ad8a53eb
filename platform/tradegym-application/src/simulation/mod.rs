use crate::config::Config;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::info_span;
use tradegym_domain::errors::SimulationError;
use tradegym_domain::repositories::market_data::{MarketDataRepository, PriceQuery};
use tradegym_domain::repositories::policy::{PolicyFactory, RunContext};
use tradegym_domain::services::simulation::{SimulationRunner, Summary};
use tradegym_domain::value_objects::history_record::HistoryRecord;
use tradegym_domain::value_objects::price_series::PriceSeries;

/// Caller-supplied overrides of the configured run. Unset fields fall back to
/// the `[run]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictQuery {
    pub ticker: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub history: Vec<HistoryRecord>,
    pub summary: Summary,
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("insufficient or empty stock data for ticker {ticker}: got {actual} points, need at least {required}")]
    InsufficientData {
        ticker: String,
        required: usize,
        actual: usize,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("market data unavailable: {0}")]
    MarketData(String),

    #[error("policy unavailable: {0}")]
    PolicyInit(String),

    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

impl PredictError {
    /// HTTP-style status for the presentation layer.
    pub fn status_code(&self) -> u16 {
        match self {
            PredictError::InsufficientData { .. } | PredictError::InvalidRequest(_) => 400,
            PredictError::MarketData(_) => 502,
            PredictError::PolicyInit(_) => 500,
            PredictError::Simulation(err) if err.is_input_error() => 400,
            PredictError::Simulation(_) => 500,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            PredictError::InsufficientData { .. } => "insufficient_data",
            PredictError::InvalidRequest(_) => "invalid_request",
            PredictError::MarketData(_) => "market_data",
            PredictError::PolicyInit(_) => "policy_init",
            PredictError::Simulation(_) => "simulation",
        }
    }
}

/// Resolved run parameters after applying query overrides to the config.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub initial_balance: f64,
    pub min_points: usize,
}

const MAX_TICKER_LEN: usize = 16;

/// Tickers end up in file paths and upstream URLs, so only exchange symbol
/// characters are accepted: `A-Z`, `0-9`, `.`, `-`, `^` and `=`, never `..`.
pub fn is_valid_ticker(ticker: &str) -> bool {
    !ticker.is_empty()
        && ticker.len() <= MAX_TICKER_LEN
        && !ticker.contains("..")
        && ticker
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b".-^=".contains(&b))
}

pub fn plan_run(config: &Config, query: &PredictQuery) -> Result<RunPlan, PredictError> {
    let ticker = query
        .ticker
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(config.run.ticker.as_str())
        .to_uppercase();
    if !is_valid_ticker(&ticker) {
        return Err(PredictError::InvalidRequest(format!(
            "invalid ticker {ticker:?}: expected 1-{MAX_TICKER_LEN} characters from A-Z 0-9 . - ^ ="
        )));
    }
    let start = query.start.unwrap_or(config.run.start);
    let end = query.end.unwrap_or(config.run.end);
    if start >= end {
        return Err(PredictError::InvalidRequest(format!(
            "start ({start}) must be before end ({end})"
        )));
    }
    let initial_balance = config.run.initial_balance;
    if !initial_balance.is_finite() || initial_balance <= 0.0 {
        return Err(SimulationError::InvalidInitialBalance(initial_balance).into());
    }
    Ok(RunPlan {
        ticker,
        start,
        end,
        initial_balance,
        min_points: config.data.min_points.max(2),
    })
}

/// Loads prices for the query, rejects short series, and replays a fresh
/// policy instance over them. No state is shared between calls apart from the
/// read-only ports.
pub fn predict(
    config: &Config,
    query: &PredictQuery,
    market_data: &dyn MarketDataRepository,
    policies: &dyn PolicyFactory,
) -> Result<PredictResponse, PredictError> {
    let result = predict_inner(config, query, market_data, policies);
    let result_label = match &result {
        Ok(_) => "ok",
        Err(err) => err.kind(),
    };
    metrics::counter!("tradegym.predict.requests_total", "result" => result_label).increment(1);
    result
}

fn predict_inner(
    config: &Config,
    query: &PredictQuery,
    market_data: &dyn MarketDataRepository,
    policies: &dyn PolicyFactory,
) -> Result<PredictResponse, PredictError> {
    let plan = plan_run(config, query)?;
    let _span = info_span!(
        "predict",
        ticker = %plan.ticker,
        start = %plan.start,
        end = %plan.end,
        policy = policies.name()
    )
    .entered();

    let stage_start = Instant::now();
    let (points, report) = market_data
        .load_prices(&PriceQuery {
            symbol: plan.ticker.clone(),
            start: plan.start,
            end: plan.end,
        })
        .map_err(PredictError::MarketData)?;
    metrics::histogram!("tradegym.predict.load_prices_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    tracing::info!(
        rows = report.rows,
        kept = report.kept,
        dropped = report.missing_close + report.invalid_close,
        duplicates = report.duplicates,
        "loaded prices"
    );

    if points.len() < plan.min_points {
        tracing::warn!(
            points = points.len(),
            required = plan.min_points,
            "rejecting run with insufficient data"
        );
        return Err(PredictError::InsufficientData {
            ticker: plan.ticker,
            required: plan.min_points,
            actual: points.len(),
        });
    }

    let prices = PriceSeries::from_points(&points)?;
    let context = RunContext {
        run_id: format!("{}_{}_{}", plan.ticker, plan.start, plan.end),
        symbol: plan.ticker.clone(),
    };
    let policy = policies
        .create(&context)
        .map_err(PredictError::PolicyInit)?;

    let stage_start = Instant::now();
    let mut runner = SimulationRunner::new(policy, prices, plan.initial_balance)?;
    let outcome = runner.run()?;
    let engine_ms = stage_start.elapsed().as_millis() as f64;
    metrics::histogram!("tradegym.predict.engine_ms").record(engine_ms);
    metrics::gauge!("tradegym.predict.steps").set(outcome.stats.steps as f64);

    tracing::info!(
        steps = outcome.stats.steps,
        buys = outcome.stats.buys,
        sells = outcome.stats.sells,
        rejected_orders = outcome.stats.rejected_orders,
        profit = outcome.summary.profit,
        profit_percent = outcome.summary.profit_percent,
        "simulation complete"
    );

    Ok(PredictResponse {
        history: outcome.history,
        summary: outcome.summary,
    })
}
