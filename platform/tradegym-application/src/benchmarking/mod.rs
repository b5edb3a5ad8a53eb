use crate::policies::BuiltinPolicyFactory;
use std::time::Instant;
use tradegym_domain::errors::SimulationError;
use tradegym_domain::repositories::policy::{PolicyFactory, RunContext};
use tradegym_domain::services::simulation::{SimulationResult, SimulationRunner};
use tradegym_domain::value_objects::price_series::PriceSeries;

pub struct BenchSummary {
    pub policy: String,
    pub steps_requested: usize,
    pub steps_processed: usize,
    pub elapsed_ms: u64,
    pub steps_per_sec: f64,
    pub result: SimulationResult,
}

/// Deterministic oscillating price path starting at 100.
pub fn synthetic_prices(points: usize) -> Vec<f64> {
    let mut prices = Vec::with_capacity(points);
    let mut price = 100.0f64;
    for i in 0..points {
        prices.push(price);
        let drift = ((i as f64) * 0.000001).sin() * 0.05;
        let shock = ((i as f64) * 0.001).cos() * 0.01;
        price = (price * (1.0 + drift + shock)).max(0.01);
    }
    prices
}

/// Runs `steps` environment steps (a series of `steps + 1` prices) with the
/// named built-in policy.
pub fn run_bench(
    steps: usize,
    policy: &str,
    initial_balance: f64,
) -> Result<BenchSummary, String> {
    if steps == 0 {
        return Err("steps must be > 0".to_string());
    }
    let factory = BuiltinPolicyFactory::by_name(policy)?;
    let prices = PriceSeries::new(synthetic_prices(steps + 1)).map_err(|err| err.to_string())?;
    let policy_instance = factory.create(&RunContext {
        run_id: format!("bench_{}_{}", factory.name(), steps),
        symbol: "BENCH".to_string(),
    })?;

    let start = Instant::now();
    let mut runner = SimulationRunner::new(policy_instance, prices, initial_balance)
        .map_err(|err: SimulationError| err.to_string())?;
    let result = runner.run().map_err(|err| err.to_string())?;
    let elapsed = start.elapsed();

    let elapsed_ms = elapsed.as_millis() as u64;
    let secs = elapsed.as_secs_f64();
    let steps_processed = result.stats.steps;
    Ok(BenchSummary {
        policy: factory.name().to_string(),
        steps_requested: steps,
        steps_processed,
        elapsed_ms,
        steps_per_sec: if secs > 0.0 {
            steps_processed as f64 / secs
        } else {
            0.0
        },
        result,
    })
}
