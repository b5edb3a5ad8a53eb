use crate::repositories::policy::Policy;
use crate::value_objects::action::Action;
use crate::value_objects::observation::Observation;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub struct HoldPolicy;

impl Policy for HoldPolicy {
    fn name(&self) -> &str {
        "hold"
    }

    fn predict(&mut self, _observation: &Observation) -> Result<i64, String> {
        Ok(Action::Hold.code())
    }
}

/// Buys a single share at the first affordable price, then holds.
#[derive(Default)]
pub struct BuyAndHoldPolicy {
    has_bought: bool,
}

impl BuyAndHoldPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Policy for BuyAndHoldPolicy {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn predict(&mut self, observation: &Observation) -> Result<i64, String> {
        if self.has_bought || observation.cash_balance() < observation.price() {
            return Ok(Action::Hold.code());
        }
        self.has_bought = true;
        Ok(Action::Buy.code())
    }
}

/// Moving-average crossover on the observed price stream.
pub struct SmaCrossPolicy {
    short_window: usize,
    long_window: usize,
    prices: Vec<f64>,
}

impl SmaCrossPolicy {
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, String> {
        if short_window == 0 || short_window >= long_window {
            return Err(format!(
                "sma windows must satisfy 0 < short < long (short={short_window}, long={long_window})"
            ));
        }
        Ok(Self {
            short_window,
            long_window,
            prices: Vec::with_capacity(long_window),
        })
    }

    fn sma(&self, window: usize) -> Option<f64> {
        if self.prices.len() < window || window == 0 {
            return None;
        }
        let slice = &self.prices[self.prices.len() - window..];
        Some(slice.iter().sum::<f64>() / window as f64)
    }
}

impl Policy for SmaCrossPolicy {
    fn name(&self) -> &str {
        "sma"
    }

    fn predict(&mut self, observation: &Observation) -> Result<i64, String> {
        self.prices.push(observation.price());
        if self.prices.len() > self.long_window {
            self.prices.remove(0);
        }

        let (Some(short), Some(long)) = (self.sma(self.short_window), self.sma(self.long_window))
        else {
            return Ok(Action::Hold.code());
        };

        let holding = observation.shares_held() > 0.0;
        if short > long && !holding {
            return Ok(Action::Buy.code());
        }
        if short < long && holding {
            return Ok(Action::Sell.code());
        }
        Ok(Action::Hold.code())
    }
}

/// Linear action-value model: `q[a] = bias[a] + sum_i weights[a][i] * obs[i] / scale[i]`.
/// Rows are indexed by action code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinearQModel {
    #[serde(default)]
    pub version: Option<String>,
    pub weights: [[f64; Observation::LEN]; 3],
    pub bias: [f64; 3],
    #[serde(default)]
    pub scale: Option<[f64; Observation::LEN]>,
}

impl LinearQModel {
    pub fn validate(&self) -> Result<(), String> {
        let mut all_weights = self.weights.iter().flatten().chain(self.bias.iter());
        if all_weights.any(|w| !w.is_finite()) {
            return Err("model weights and bias must be finite".to_string());
        }
        if let Some(scale) = &self.scale {
            if scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
                return Err("model scale entries must be finite and non-zero".to_string());
            }
        }
        Ok(())
    }

    pub fn q_values(&self, observation: &Observation) -> [f64; 3] {
        let mut features = observation.values;
        if let Some(scale) = &self.scale {
            for (value, s) in features.iter_mut().zip(scale) {
                *value /= s;
            }
        }
        let mut q = self.bias;
        for (row, q_a) in self.weights.iter().zip(q.iter_mut()) {
            *q_a += row.iter().zip(&features).map(|(w, x)| w * x).sum::<f64>();
        }
        q
    }

    /// Greedy action; ties go to the lowest code.
    pub fn best_action(&self, observation: &Observation) -> Action {
        let q = self.q_values(observation);
        let mut best = 0;
        for idx in 1..q.len() {
            if q[idx] > q[best] {
                best = idx;
            }
        }
        Action::ALL[best]
    }
}

/// Greedy policy over a shared, read-only model.
pub struct LinearQPolicy {
    model: Arc<LinearQModel>,
}

impl LinearQPolicy {
    pub fn new(model: Arc<LinearQModel>) -> Self {
        Self { model }
    }
}

impl Policy for LinearQPolicy {
    fn name(&self) -> &str {
        "linear_q"
    }

    fn predict(&mut self, observation: &Observation) -> Result<i64, String> {
        Ok(self.model.best_action(observation).code())
    }
}

#[cfg(test)]
mod tests {
    use super::{BuyAndHoldPolicy, HoldPolicy, LinearQModel, LinearQPolicy, SmaCrossPolicy};
    use crate::repositories::policy::Policy;
    use crate::value_objects::observation::Observation;
    use std::sync::Arc;

    #[test]
    fn hold_always_holds() {
        let mut policy = HoldPolicy;
        assert_eq!(policy.predict(&Observation::new(1.0, 1.0, 0)), Ok(0));
    }

    #[test]
    fn buy_and_hold_waits_until_affordable_then_buys_once() {
        let mut policy = BuyAndHoldPolicy::new();
        assert_eq!(policy.predict(&Observation::new(5.0, 10.0, 0)), Ok(0));
        assert_eq!(policy.predict(&Observation::new(5.0, 4.0, 0)), Ok(1));
        assert_eq!(policy.predict(&Observation::new(1.0, 0.5, 1)), Ok(0));
    }

    #[test]
    fn sma_rejects_bad_windows() {
        assert!(SmaCrossPolicy::new(0, 3).is_err());
        assert!(SmaCrossPolicy::new(3, 3).is_err());
        assert!(SmaCrossPolicy::new(2, 3).is_ok());
    }

    #[test]
    fn sma_buys_on_uptrend_and_sells_on_downtrend() {
        let mut policy = SmaCrossPolicy::new(1, 3).expect("policy");
        assert_eq!(policy.predict(&Observation::new(100.0, 1.0, 0)), Ok(0));
        assert_eq!(policy.predict(&Observation::new(100.0, 2.0, 0)), Ok(0));
        assert_eq!(policy.predict(&Observation::new(100.0, 3.0, 0)), Ok(1));
        assert_eq!(policy.predict(&Observation::new(97.0, 4.0, 1)), Ok(0));
        assert_eq!(policy.predict(&Observation::new(97.0, 1.0, 1)), Ok(2));
    }

    fn model(bias: [f64; 3]) -> LinearQModel {
        LinearQModel {
            version: None,
            weights: [[0.0; 3]; 3],
            bias,
            scale: None,
        }
    }

    #[test]
    fn linear_q_picks_argmax_with_low_code_ties() {
        let obs = Observation::new(100.0, 10.0, 0);
        let mut policy = LinearQPolicy::new(Arc::new(model([0.0, 2.0, 1.0])));
        assert_eq!(policy.predict(&obs), Ok(1));

        let tied = model([1.0, 1.0, 1.0]);
        assert_eq!(tied.best_action(&obs).code(), 0);
    }

    #[test]
    fn linear_q_applies_scale_and_weights() {
        let mut m = model([0.0, 0.0, 0.0]);
        m.weights[2] = [0.0, 0.0, 1.0];
        m.scale = Some([1.0, 1.0, 0.5]);
        let q = m.q_values(&Observation::new(0.0, 0.0, 3));
        assert_eq!(q, [0.0, 0.0, 6.0]);
        assert!(m.validate().is_ok());

        m.scale = Some([1.0, 0.0, 1.0]);
        assert!(m.validate().is_err());
    }

    #[test]
    fn linear_q_model_parses_from_json() {
        let json = r#"{"weights":[[0,0,0],[0,-0.1,0],[0,0.1,0]],"bias":[0.5,0,0]}"#;
        let model: LinearQModel = serde_json::from_str(json).expect("parse model");
        assert!(model.validate().is_ok());
        assert_eq!(model.best_action(&Observation::new(0.0, 10.0, 0)).code(), 2);
    }
}
