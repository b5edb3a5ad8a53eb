pub mod csv_file;
pub mod yahoo;

pub use csv_file::CsvMarketDataRepository;
pub use yahoo::YahooMarketDataRepository;

use std::time::Instant;

fn record_load_metrics<T>(source: &'static str, start: Instant, result: &Result<T, String>) {
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!(
        "tradegym.infra.market_data.load.calls_total",
        "source" => source,
        "result" => result_label
    )
    .increment(1);
    metrics::histogram!(
        "tradegym.infra.market_data.load_ms",
        "source" => source,
        "result" => result_label
    )
    .record(start.elapsed().as_millis() as f64);
}
