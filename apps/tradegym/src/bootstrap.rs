use std::path::{Path, PathBuf};
use std::sync::Arc;
use tradegym_application::config::{load_config, Config, DataSource, PolicyMode};
use tradegym_application::policies::BuiltinPolicyFactory;
use tradegym_domain::repositories::market_data::MarketDataRepository;
use tradegym_domain::repositories::policy::PolicyFactory;
use tradegym_infrastructure::artifacts::load_linear_model;
use tradegym_infrastructure::market_data::{CsvMarketDataRepository, YahooMarketDataRepository};
use tradegym_infrastructure::policy::{RemotePolicyClient, RemotePolicyFactory};

/// Process-wide collaborators, built once and shared by every run.
#[derive(Clone)]
pub struct Deps {
    pub market_data: Arc<dyn MarketDataRepository>,
    pub policies: Arc<dyn PolicyFactory>,
}

/// Loads the config file when one is given; otherwise starts from defaults.
pub fn resolve_config(path: Option<&Path>) -> Result<Config, String> {
    match path {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}

pub fn build_deps(config: &Config) -> Result<Deps, String> {
    config.validate()?;
    let deps = Deps {
        market_data: build_market_data_repo(config)?,
        policies: build_policy_factory(config)?,
    };
    tracing::info!(
        source = ?config.data.source,
        policy = deps.policies.name(),
        "dependencies ready"
    );
    Ok(deps)
}

pub fn build_market_data_repo(config: &Config) -> Result<Arc<dyn MarketDataRepository>, String> {
    match config.data.source {
        DataSource::Csv => {
            let path = config
                .data
                .csv_path
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| "data.source=csv requires data.csv_path".to_string())?;
            Ok(Arc::new(CsvMarketDataRepository::new(path)))
        }
        DataSource::Yahoo => Ok(Arc::new(YahooMarketDataRepository::new(
            config.data.base_url.clone(),
            config.data.timeout_ms,
        )?)),
    }
}

pub fn build_policy_factory(config: &Config) -> Result<Arc<dyn PolicyFactory>, String> {
    match config.policy.mode {
        PolicyMode::Baseline => Ok(Arc::new(BuiltinPolicyFactory::from_baseline(
            &config.policy,
        )?)),
        PolicyMode::Model => {
            let path = config
                .policy
                .model_path
                .as_deref()
                .map(PathBuf::from)
                .ok_or_else(|| "policy.mode=model requires policy.model_path".to_string())?;
            let model = load_linear_model(&path)?;
            Ok(Arc::new(BuiltinPolicyFactory::from_model(model)?))
        }
        PolicyMode::Remote => {
            let client = RemotePolicyClient::new(
                config.policy.url.clone(),
                config.policy.timeout_ms,
                config.policy.api_version.clone(),
                config.policy.retries,
            )?;
            Ok(Arc::new(RemotePolicyFactory::new(client)))
        }
    }
}
