use crate::bootstrap::{build_deps, resolve_config};
use crate::server::{self, AppState};
use chrono::NaiveDate;
use std::path::PathBuf;
use tradegym_application::config::{Config, DataSource};
use tradegym_application::simulation::{predict, PredictQuery, PredictResponse};
use tradegym_application::validation::validate;

pub struct SimulateArgs {
    pub config: Option<PathBuf>,
    pub ticker: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub prices_csv: Option<String>,
    pub json: bool,
}

pub enum Command {
    Simulate(SimulateArgs),
    Validate {
        config: Option<PathBuf>,
        strict: bool,
    },
    Serve {
        config: Option<PathBuf>,
        bind: Option<String>,
    },
}

pub fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Simulate(args) => run_simulate(args),
        Command::Validate { config, strict } => run_validate(config, strict),
        Command::Serve { config, bind } => run_serve(config, bind),
    }
}

/// `--prices-csv` switches the data source to that file.
pub fn apply_prices_csv(config: &mut Config, prices_csv: Option<String>) {
    if let Some(path) = prices_csv {
        config.data.source = DataSource::Csv;
        config.data.csv_path = Some(path);
    }
}

pub fn simulate(config: &Config, query: &PredictQuery) -> Result<PredictResponse, String> {
    let deps = build_deps(config)?;
    predict(
        config,
        query,
        deps.market_data.as_ref(),
        deps.policies.as_ref(),
    )
    .map_err(|err| err.to_string())
}

fn run_simulate(args: SimulateArgs) -> Result<(), String> {
    let mut config = resolve_config(args.config.as_deref())?;
    apply_prices_csv(&mut config, args.prices_csv);
    let query = PredictQuery {
        ticker: args.ticker,
        start: args.start,
        end: args.end,
    };
    let response = simulate(&config, &query)?;

    if args.json {
        let text = serde_json::to_string_pretty(&response)
            .map_err(|err| format!("failed to serialize response: {err}"))?;
        println!("{text}");
    } else {
        print!("{}", render_summary(&response));
    }
    Ok(())
}

pub fn render_summary(response: &PredictResponse) -> String {
    let mut out = String::new();
    let (buys, sells) = response
        .history
        .iter()
        .fold((0usize, 0usize), |(b, s), record| match record.action {
            1 => (b + 1, s),
            2 => (b, s + 1),
            _ => (b, s),
        });
    out.push_str(&format!(
        "steps={} buy_signals={} sell_signals={}\n",
        response.history.len(),
        buys,
        sells
    ));
    if let (Some(first), Some(last)) = (response.history.first(), response.history.last()) {
        out.push_str(&format!(
            "prices: first={:.4} last={:.4}\n",
            first.price, last.price
        ));
    }
    let summary = &response.summary;
    out.push_str(&format!(
        "initial_balance={:.2} final_balance={:.2} profit={:.2} profit_percent={:.2}%\n",
        summary.initial_balance, summary.final_balance, summary.profit, summary.profit_percent
    ));
    out
}

fn run_validate(config_path: Option<PathBuf>, strict: bool) -> Result<(), String> {
    let config = resolve_config(config_path.as_deref())?;
    let deps = build_deps(&config)?;
    let report = validate(&config, strict, deps.market_data.as_ref())?;
    let text = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("failed to serialize report: {err}"))?;
    println!("{text}");
    if report["accepted"].as_bool() != Some(true) {
        return Err("validation failed".to_string());
    }
    Ok(())
}

fn run_serve(config_path: Option<PathBuf>, bind: Option<String>) -> Result<(), String> {
    let config = resolve_config(config_path.as_deref())?;
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    // Blocking HTTP clients inside the deps must be created and dropped
    // outside the async runtime.
    let deps = build_deps(&config)?;
    let state = AppState::new(config, deps);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("failed to start runtime: {err}"))?;
    let result = runtime.block_on(server::serve(state.clone(), &bind));
    drop(runtime);
    drop(state);
    result
}

#[cfg(test)]
mod tests {
    use super::{apply_prices_csv, render_summary, simulate};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tradegym_application::config::{BaselinePolicy, Config, DataSource};
    use tradegym_application::simulation::PredictQuery;

    fn unique_tmp_path(name: &str) -> PathBuf {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("tradegym_{name}_{}_{}", std::process::id(), now))
    }

    #[test]
    fn simulate_from_csv_override() {
        let path = unique_tmp_path("sim.csv");
        fs::write(&path, "date,close\n2022-01-03,10\n2022-01-04,12\n2022-01-05,8\n")
            .expect("write csv");

        let mut config = Config::default();
        config.run.initial_balance = 100.0;
        config.data.min_points = 3;
        config.policy.baseline = BaselinePolicy::Hold;
        apply_prices_csv(&mut config, Some(path.display().to_string()));
        assert_eq!(config.data.source, DataSource::Csv);

        let response = simulate(&config, &PredictQuery::default()).expect("simulate");
        assert_eq!(response.history.len(), 2);
        assert_eq!(response.summary.profit, 0.0);

        let text = render_summary(&response);
        assert!(text.contains("steps=2"));
        assert!(text.contains("profit=0.00"));
        let _ = fs::remove_file(&path);
    }
}
