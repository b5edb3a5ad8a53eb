use crate::config::{BaselinePolicy, PolicyConfig};
use std::sync::Arc;
use tradegym_domain::repositories::policy::{Policy, PolicyFactory, RunContext};
use tradegym_domain::services::policies::{
    BuyAndHoldPolicy, HoldPolicy, LinearQModel, LinearQPolicy, SmaCrossPolicy,
};

/// In-process policies: the fixed baselines and a greedy policy over a linear
/// model loaded once at startup.
#[derive(Debug, Clone)]
pub enum BuiltinPolicyFactory {
    Hold,
    BuyAndHold,
    Sma { short: usize, long: usize },
    LinearQ(Arc<LinearQModel>),
}

impl BuiltinPolicyFactory {
    pub fn from_baseline(config: &PolicyConfig) -> Result<Self, String> {
        Ok(match config.baseline {
            BaselinePolicy::Hold => Self::Hold,
            BaselinePolicy::BuyAndHold => Self::BuyAndHold,
            BaselinePolicy::Sma => {
                SmaCrossPolicy::new(config.sma_short, config.sma_long)?;
                Self::Sma {
                    short: config.sma_short,
                    long: config.sma_long,
                }
            }
        })
    }

    pub fn from_model(model: LinearQModel) -> Result<Self, String> {
        model.validate()?;
        Ok(Self::LinearQ(Arc::new(model)))
    }

    /// Resolves a baseline by its config name (`hold`, `buy_and_hold`, `sma`).
    pub fn by_name(name: &str) -> Result<Self, String> {
        match name.trim().to_lowercase().as_str() {
            "hold" => Ok(Self::Hold),
            "buy_and_hold" => Ok(Self::BuyAndHold),
            "sma" => Ok(Self::Sma { short: 5, long: 20 }),
            other => Err(format!(
                "unsupported policy: {other} (use: hold | buy_and_hold | sma)"
            )),
        }
    }
}

impl PolicyFactory for BuiltinPolicyFactory {
    fn name(&self) -> &str {
        match self {
            Self::Hold => "hold",
            Self::BuyAndHold => "buy_and_hold",
            Self::Sma { .. } => "sma",
            Self::LinearQ(_) => "linear_q",
        }
    }

    fn create(&self, _context: &RunContext) -> Result<Box<dyn Policy + Send>, String> {
        Ok(match self {
            Self::Hold => Box::new(HoldPolicy),
            Self::BuyAndHold => Box::new(BuyAndHoldPolicy::new()),
            Self::Sma { short, long } => Box::new(SmaCrossPolicy::new(*short, *long)?),
            Self::LinearQ(model) => Box::new(LinearQPolicy::new(Arc::clone(model))),
        })
    }
}
