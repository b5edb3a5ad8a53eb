use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tradegym_application::config::{Config, DataSource};
use tradegym_application::policies::BuiltinPolicyFactory;
use tradegym_application::simulation::{predict, PredictError, PredictQuery};
use tradegym_application::validation::validate;
use tradegym_domain::errors::SimulationError;
use tradegym_domain::repositories::market_data::{MarketDataRepository, PriceQuery};
use tradegym_domain::repositories::policy::{Policy, PolicyFactory, RunContext};
use tradegym_domain::services::prices::{canonicalize_closes, DataQualityReport};
use tradegym_domain::value_objects::observation::Observation;
use tradegym_domain::value_objects::price_point::PricePoint;
use tradegym_infrastructure::market_data::CsvMarketDataRepository;

struct FixedPrices {
    closes: Vec<f64>,
    queries: Mutex<Vec<PriceQuery>>,
}

impl FixedPrices {
    fn new(closes: &[f64]) -> Self {
        Self {
            closes: closes.to_vec(),
            queries: Mutex::new(Vec::new()),
        }
    }
}

impl MarketDataRepository for FixedPrices {
    fn load_prices(
        &self,
        query: &PriceQuery,
    ) -> Result<(Vec<PricePoint>, DataQualityReport), String> {
        self.queries.lock().expect("lock").push(query.clone());
        let rows: Vec<(i64, Option<f64>)> = self
            .closes
            .iter()
            .enumerate()
            .map(|(i, close)| (i as i64 * 86_400, Some(*close)))
            .collect();
        Ok(canonicalize_closes(&rows))
    }
}

struct Unavailable;

impl MarketDataRepository for Unavailable {
    fn load_prices(
        &self,
        _query: &PriceQuery,
    ) -> Result<(Vec<PricePoint>, DataQualityReport), String> {
        Err("upstream timed out".to_string())
    }
}

struct Scripted {
    codes: Vec<i64>,
    cursor: usize,
}

impl Policy for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn predict(&mut self, _observation: &Observation) -> Result<i64, String> {
        let code = self.codes.get(self.cursor).copied().unwrap_or(0);
        self.cursor += 1;
        Ok(code)
    }
}

struct ScriptedFactory {
    codes: Vec<i64>,
    created: AtomicUsize,
}

impl ScriptedFactory {
    fn new(codes: &[i64]) -> Self {
        Self {
            codes: codes.to_vec(),
            created: AtomicUsize::new(0),
        }
    }
}

impl PolicyFactory for ScriptedFactory {
    fn name(&self) -> &str {
        "scripted"
    }

    fn create(&self, _context: &RunContext) -> Result<Box<dyn Policy + Send>, String> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Scripted {
            codes: self.codes.clone(),
            cursor: 0,
        }))
    }
}

fn small_config(initial_balance: f64, min_points: usize) -> Config {
    let mut config = Config::default();
    config.run.initial_balance = initial_balance;
    config.data.min_points = min_points;
    config
}

fn unique_tmp_path(name: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!("tradegym_{name}_{}_{}", std::process::id(), now))
}

#[test]
fn predict_buy_then_sell_reports_history_and_profit() {
    let prices = FixedPrices::new(&[10.0, 12.0, 8.0]);
    let factory = ScriptedFactory::new(&[1, 2]);
    let response = predict(
        &small_config(100.0, 2),
        &PredictQuery::default(),
        &prices,
        &factory,
    )
    .expect("predict");

    assert_eq!(response.history.len(), 2);
    let first = &response.history[0];
    assert_eq!(first.step, 1);
    assert_eq!(first.price, 12.0);
    assert_eq!(first.action, 1);
    assert_eq!(first.action_name, "buy");
    assert_eq!(first.net_worth, 102.0);
    let second = &response.history[1];
    assert_eq!(second.step, 2);
    assert_eq!(second.price, 8.0);
    assert_eq!(second.action_name, "sell");
    assert_eq!(second.net_worth, 102.0);

    assert_eq!(response.summary.initial_balance, 100.0);
    assert_eq!(response.summary.final_balance, 102.0);
    assert_eq!(response.summary.profit, 2.0);
    assert!((response.summary.profit_percent - 2.0).abs() < 1e-9);
}

#[test]
fn predict_passes_normalized_query_to_market_data() {
    let prices = FixedPrices::new(&[10.0, 11.0, 12.0]);
    let factory = ScriptedFactory::new(&[]);
    let query = PredictQuery {
        ticker: Some("msft".to_string()),
        start: NaiveDate::from_ymd_opt(2021, 1, 1),
        end: NaiveDate::from_ymd_opt(2021, 6, 1),
    };
    predict(&small_config(100.0, 2), &query, &prices, &factory).expect("predict");

    let seen = prices.queries.lock().expect("lock");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].symbol, "MSFT");
    assert_eq!(seen[0].start, NaiveDate::from_ymd_opt(2021, 1, 1).expect("date"));
    assert_eq!(seen[0].end, NaiveDate::from_ymd_opt(2021, 6, 1).expect("date"));
}

#[test]
fn predict_rejects_short_series_before_creating_a_policy() {
    let prices = FixedPrices::new(&[10.0, 11.0, 12.0]);
    let factory = ScriptedFactory::new(&[]);
    let err = predict(
        &small_config(100.0, 10),
        &PredictQuery::default(),
        &prices,
        &factory,
    )
    .expect_err("insufficient data");

    assert!(matches!(
        err,
        PredictError::InsufficientData {
            required: 10,
            actual: 3,
            ..
        }
    ));
    assert_eq!(err.status_code(), 400);
    assert_eq!(factory.created.load(Ordering::SeqCst), 0);
}

#[test]
fn predict_empty_series_is_a_client_error() {
    let prices = FixedPrices::new(&[]);
    let factory = ScriptedFactory::new(&[]);
    let err = predict(
        &small_config(100.0, 2),
        &PredictQuery::default(),
        &prices,
        &factory,
    )
    .expect_err("empty");
    assert_eq!(err.status_code(), 400);
    assert!(err.to_string().contains("AAPL"));
}

#[test]
fn predict_aborts_on_invalid_action_code() {
    let prices = FixedPrices::new(&[10.0, 11.0, 12.0, 13.0]);
    let factory = ScriptedFactory::new(&[0, 5]);
    let err = predict(
        &small_config(100.0, 2),
        &PredictQuery::default(),
        &prices,
        &factory,
    )
    .expect_err("invalid action");
    assert!(matches!(
        err,
        PredictError::Simulation(SimulationError::InvalidAction(5))
    ));
    assert_eq!(err.status_code(), 500);
}

#[test]
fn predict_maps_market_data_failure_to_bad_gateway() {
    let factory = ScriptedFactory::new(&[]);
    let err = predict(
        &small_config(100.0, 2),
        &PredictQuery::default(),
        &Unavailable,
        &factory,
    )
    .expect_err("unavailable");
    assert!(matches!(err, PredictError::MarketData(_)));
    assert_eq!(err.status_code(), 502);
}

#[test]
fn repeated_predictions_use_fresh_policy_instances() {
    let prices = FixedPrices::new(&[10.0, 12.0, 8.0]);
    let factory = ScriptedFactory::new(&[1, 2]);
    let config = small_config(100.0, 2);
    let a = predict(&config, &PredictQuery::default(), &prices, &factory).expect("first");
    let b = predict(&config, &PredictQuery::default(), &prices, &factory).expect("second");
    assert_eq!(a, b);
    assert_eq!(factory.created.load(Ordering::SeqCst), 2);
}

#[test]
fn builtin_buy_and_hold_over_csv_file() {
    let path = unique_tmp_path("aapl.csv");
    fs::write(
        &path,
        "date,close\n2022-01-03,10\n2022-01-04,12\n2022-01-05,\n2022-01-06,8\n2022-01-07,20\n",
    )
    .expect("write csv");

    let mut config = small_config(25.0, 3);
    config.data.source = DataSource::Csv;
    config.data.csv_path = Some(path.display().to_string());
    let repo = CsvMarketDataRepository::new(path.display().to_string());
    let factory = BuiltinPolicyFactory::by_name("buy_and_hold").expect("factory");

    let response = predict(&config, &PredictQuery::default(), &repo, &factory).expect("predict");
    // Prices [10, 12, 8, 20]: one share bought at 10, valued at 20 at the end.
    assert_eq!(response.history.len(), 3);
    assert_eq!(response.history[0].action_name, "buy");
    assert_eq!(response.history[0].net_worth, 27.0);
    assert_eq!(response.history[2].step, 3);
    assert_eq!(response.history[2].price, 20.0);
    assert_eq!(response.summary.final_balance, 35.0);
    assert_eq!(response.summary.profit, 10.0);

    let report = validate(&config, true, &repo).expect("validate");
    assert_eq!(report["points"], 4);
    assert_eq!(report["expected_steps"], 3);
    assert_eq!(report["accepted"], false);
    assert_eq!(report["data_quality"]["missing_close"], 1);

    let report = validate(&config, false, &repo).expect("validate");
    assert_eq!(report["accepted"], true);
    let _ = fs::remove_file(&path);
}

#[test]
fn predict_never_reads_outside_the_csv_template_directory() {
    let root = unique_tmp_path("tickers");
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).expect("create data dir");
    fs::write(root.join("SECRET.csv"), "date,close\n2022-01-03,1\n2022-01-04,2\n")
        .expect("write outside file");

    let template = format!("{}/{{symbol}}.csv", data_dir.display());
    let repo = CsvMarketDataRepository::new(template);
    let factory = ScriptedFactory::new(&[]);
    let config = small_config(100.0, 2);

    for ticker in ["../SECRET", "A/B"] {
        let query = PredictQuery {
            ticker: Some(ticker.to_string()),
            ..PredictQuery::default()
        };
        let err = predict(&config, &query, &repo, &factory).expect_err(ticker);
        assert!(matches!(err, PredictError::InvalidRequest(_)), "{ticker}");
        assert_eq!(err.status_code(), 400);
    }
    assert_eq!(factory.created.load(Ordering::SeqCst), 0);
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn validate_flags_short_window() {
    let prices = FixedPrices::new(&[10.0, 11.0]);
    let report = validate(&small_config(100.0, 5), false, &prices).expect("validate");
    assert_eq!(report["accepted"], false);
    assert_eq!(report["issues"].as_array().map(Vec::len), Some(1));
}

#[test]
fn validate_rejects_bad_config_before_loading() {
    let report = validate(&small_config(0.0, 5), false, &Unavailable);
    assert!(report.unwrap_err().contains("initial_balance"));
}
