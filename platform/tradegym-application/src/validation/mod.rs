use crate::config::Config;
use crate::simulation::{plan_run, PredictQuery};
use std::time::Instant;
use tracing::info_span;
use tradegym_domain::repositories::market_data::{MarketDataRepository, PriceQuery};
use tradegym_domain::services::environment::MIN_SERIES_LEN;
use tradegym_domain::value_objects::price_series::PriceSeries;

/// Checks the configuration and the configured price window without running
/// a policy. With `strict`, any dropped or duplicated row fails validation.
pub fn validate(
    config: &Config,
    strict: bool,
    market_data: &dyn MarketDataRepository,
) -> Result<serde_json::Value, String> {
    let _span = info_span!(
        "validate",
        strict = strict,
        ticker = %config.run.ticker,
        start = %config.run.start,
        end = %config.run.end
    )
    .entered();

    config.validate()?;
    let plan = plan_run(config, &PredictQuery::default()).map_err(|err| err.to_string())?;

    let stage_start = Instant::now();
    let (points, report) = market_data.load_prices(&PriceQuery {
        symbol: plan.ticker.clone(),
        start: plan.start,
        end: plan.end,
    })?;
    metrics::histogram!("tradegym.validate.load_prices_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    let series_ok = PriceSeries::from_points(&points).is_ok();
    let enough_points = points.len() >= plan.min_points.max(MIN_SERIES_LEN);
    let dirty_rows = report.missing_close + report.invalid_close + report.duplicates;
    let accepted = series_ok && enough_points && (!strict || dirty_rows == 0);

    let mut issues: Vec<String> = Vec::new();
    if !enough_points {
        issues.push(format!(
            "only {} price points in range, need at least {}",
            points.len(),
            plan.min_points
        ));
    }
    if strict && dirty_rows > 0 {
        issues.push(format!(
            "{dirty_rows} rows were dropped or deduplicated (missing={}, invalid={}, duplicates={})",
            report.missing_close, report.invalid_close, report.duplicates
        ));
    }
    if !series_ok {
        issues.push("price series contains negative or non-finite values".to_string());
    }

    if accepted {
        tracing::info!(points = points.len(), "validation passed");
    } else {
        tracing::warn!(points = points.len(), issues = ?issues, "validation failed");
    }

    Ok(serde_json::json!({
        "ticker": plan.ticker,
        "start": plan.start.to_string(),
        "end": plan.end.to_string(),
        "initial_balance": plan.initial_balance,
        "points": points.len(),
        "min_points": plan.min_points,
        "expected_steps": points.len().saturating_sub(1),
        "accepted": accepted,
        "issues": issues,
        "data_quality": report,
    }))
}
