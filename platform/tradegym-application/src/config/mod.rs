use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Yahoo,
    Csv,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    Model,
    Remote,
    Baseline,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BaselinePolicy {
    Hold,
    BuyAndHold,
    Sma,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub run: RunConfig,
    pub data: DataConfig,
    pub policy: PolicyConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct RunConfig {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub initial_balance: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticker: "AAPL".to_string(),
            start: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            initial_balance: 10_000.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct DataConfig {
    pub source: DataSource,
    pub csv_path: Option<String>,
    pub base_url: String,
    pub timeout_ms: u64,
    /// Runs with fewer prices than this are rejected before the engine starts.
    pub min_points: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: DataSource::Yahoo,
            csv_path: None,
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_ms: 10_000,
            min_points: 10,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct PolicyConfig {
    pub mode: PolicyMode,
    pub baseline: BaselinePolicy,
    pub sma_short: usize,
    pub sma_long: usize,
    pub model_path: Option<String>,
    pub url: String,
    pub timeout_ms: u64,
    pub retries: u32,
    pub api_version: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            mode: PolicyMode::Baseline,
            baseline: BaselinePolicy::BuyAndHold,
            sma_short: 5,
            sma_long: 20,
            model_path: None,
            url: "http://127.0.0.1:8000".to_string(),
            timeout_ms: 2_000,
            retries: 0,
            api_version: "v1".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

impl Config {
    /// Rejects configurations that could never produce a valid run, so that
    /// such problems surface before any data is fetched.
    pub fn validate(&self) -> Result<(), String> {
        let balance = self.run.initial_balance;
        if !balance.is_finite() || balance <= 0.0 {
            return Err(format!(
                "run.initial_balance must be a finite value > 0 (got {balance})"
            ));
        }
        if self.run.ticker.trim().is_empty() {
            return Err("run.ticker must not be empty".to_string());
        }
        if !crate::simulation::is_valid_ticker(&self.run.ticker.trim().to_uppercase()) {
            return Err(format!(
                "run.ticker contains characters outside A-Z 0-9 . - ^ = (got {:?})",
                self.run.ticker
            ));
        }
        if self.run.start >= self.run.end {
            return Err(format!(
                "run.start ({}) must be before run.end ({})",
                self.run.start, self.run.end
            ));
        }
        if self.data.min_points < 2 {
            return Err(format!(
                "data.min_points must be >= 2 (got {})",
                self.data.min_points
            ));
        }
        if self.data.source == DataSource::Csv
            && self
                .data
                .csv_path
                .as_deref()
                .map_or(true, |p| p.trim().is_empty())
        {
            return Err("data.source=csv requires data.csv_path".to_string());
        }
        match self.policy.mode {
            PolicyMode::Model => {
                if self
                    .policy
                    .model_path
                    .as_deref()
                    .map_or(true, |p| p.trim().is_empty())
                {
                    return Err("policy.mode=model requires policy.model_path".to_string());
                }
            }
            PolicyMode::Remote => {
                if self.policy.url.trim().is_empty() {
                    return Err("policy.mode=remote requires policy.url".to_string());
                }
            }
            PolicyMode::Baseline => {
                if self.policy.baseline == BaselinePolicy::Sma
                    && (self.policy.sma_short == 0 || self.policy.sma_short >= self.policy.sma_long)
                {
                    return Err(format!(
                        "policy.sma_short must be > 0 and < policy.sma_long (got {} / {})",
                        self.policy.sma_short, self.policy.sma_long
                    ));
                }
            }
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let (config, _source) = load_config_with_source(path)?;
    Ok(config)
}

pub fn load_config_with_source(path: &Path) -> Result<(Config, String), String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config = parse_config(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    Ok((config, contents))
}

pub fn parse_config(contents: &str) -> Result<Config, String> {
    toml::from_str(contents).map_err(|err| err.to_string())
}

pub fn to_toml_pretty(config: &Config) -> Result<String, String> {
    toml::to_string_pretty(config)
        .map_err(|err| format!("failed to serialize config as TOML: {err}"))
}
