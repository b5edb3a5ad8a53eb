use crate::entities::portfolio::PortfolioState;
use crate::errors::SimulationError;
use crate::value_objects::action::Action;
use crate::value_objects::observation::Observation;
use crate::value_objects::price_series::PriceSeries;
use serde::Serialize;
use std::collections::BTreeMap;

/// Minimum series length the environment accepts: the observation after the
/// first step reads index 1.
pub const MIN_SERIES_LEN: usize = 2;

/// Auxiliary per-step diagnostics. Always empty for the trading environment.
pub type StepInfo = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult<O> {
    pub observation: O,
    pub reward: f64,
    pub terminal: bool,
    pub info: StepInfo,
}

/// Standard single-agent sequential-decision contract.
pub trait Environment {
    type Action;
    type Observation;

    fn reset(&mut self) -> Self::Observation;

    fn step(
        &mut self,
        action: Self::Action,
    ) -> Result<StepResult<Self::Observation>, SimulationError>;

    fn render(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvStatus {
    Active,
    Terminal,
}

/// Result of applying an action to the portfolio, before the index advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    Executed,
    Rejected,
    NoOrder,
}

/// Deterministic single-asset portfolio simulator over a fixed price series.
///
/// Reward is `cash + shares * price - initial_balance`, computed with the
/// price the action was evaluated at. It is cumulative (net worth over the
/// starting balance), not the change since the previous step.
///
/// The episode ends once `current_step >= len - 1`, so the last price is
/// observed but never traded at.
#[derive(Debug, Clone)]
pub struct TradingEnvironment {
    prices: PriceSeries,
    initial_balance: f64,
    state: PortfolioState,
    status: EnvStatus,
    last_fill: Fill,
}

impl TradingEnvironment {
    pub fn new(prices: PriceSeries, initial_balance: f64) -> Result<Self, SimulationError> {
        if !initial_balance.is_finite() || initial_balance <= 0.0 {
            return Err(SimulationError::InvalidInitialBalance(initial_balance));
        }
        if prices.len() < MIN_SERIES_LEN {
            return Err(SimulationError::InsufficientData {
                required: MIN_SERIES_LEN,
                actual: prices.len(),
            });
        }
        Ok(Self {
            prices,
            initial_balance,
            state: PortfolioState::new(initial_balance),
            status: EnvStatus::Active,
            last_fill: Fill::NoOrder,
        })
    }

    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    pub fn prices(&self) -> &PriceSeries {
        &self.prices
    }

    pub fn state(&self) -> &PortfolioState {
        &self.state
    }

    pub fn status(&self) -> EnvStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status == EnvStatus::Terminal
    }

    /// Outcome of the order placed by the most recent `step`.
    pub fn last_fill(&self) -> Fill {
        self.last_fill
    }

    pub fn current_price(&self) -> f64 {
        self.prices.price_at_or_last(self.state.current_step)
    }

    fn observation(&self) -> Observation {
        Observation::new(
            self.state.cash_balance,
            self.current_price(),
            self.state.shares_held,
        )
    }
}

impl Environment for TradingEnvironment {
    type Action = Action;
    type Observation = Observation;

    fn reset(&mut self) -> Observation {
        self.state = PortfolioState::new(self.initial_balance);
        self.status = EnvStatus::Active;
        self.last_fill = Fill::NoOrder;
        self.observation()
    }

    fn step(&mut self, action: Action) -> Result<StepResult<Observation>, SimulationError> {
        if self.status == EnvStatus::Terminal {
            return Err(SimulationError::StepAfterTerminal {
                step: self.state.current_step,
            });
        }

        let price = self.current_price();
        self.last_fill = match action {
            Action::Hold => Fill::NoOrder,
            Action::Buy if self.state.try_buy(price) => Fill::Executed,
            Action::Sell if self.state.try_sell(price) => Fill::Executed,
            Action::Buy | Action::Sell => Fill::Rejected,
        };

        self.state.current_step += 1;
        let terminal = self.state.current_step >= self.prices.len() - 1;
        if terminal {
            self.status = EnvStatus::Terminal;
        }

        let reward = self.state.net_worth(price) - self.initial_balance;

        Ok(StepResult {
            observation: self.observation(),
            reward,
            terminal,
            info: StepInfo::new(),
        })
    }

    fn render(&self) {
        tracing::info!(
            step = self.state.current_step,
            balance = self.state.cash_balance,
            shares_held = self.state.shares_held,
            status = ?self.status,
            "environment state"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{EnvStatus, Environment, Fill, TradingEnvironment};
    use crate::errors::SimulationError;
    use crate::value_objects::action::Action;
    use crate::value_objects::price_series::PriceSeries;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("lock")).into_owned()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn env(prices: &[f64], balance: f64) -> TradingEnvironment {
        TradingEnvironment::new(PriceSeries::new(prices.to_vec()).expect("series"), balance)
            .expect("env")
    }

    #[test]
    fn reset_yields_initial_observation() {
        let mut env = env(&[10.0, 12.0, 8.0], 100.0);
        let obs = env.reset();
        assert_eq!(obs.values, [100.0, 10.0, 0.0]);
        assert_eq!(env.reset(), obs);
    }

    #[test]
    fn concrete_buy_then_sell_scenario() {
        let mut env = env(&[10.0, 12.0, 8.0], 100.0);
        env.reset();

        let first = env.step(Action::Buy).expect("step 1");
        assert_eq!(env.state().cash_balance, 90.0);
        assert_eq!(env.state().shares_held, 1);
        assert_eq!(env.state().current_step, 1);
        assert_eq!(first.reward, 0.0);
        assert!(!first.terminal);
        assert_eq!(first.observation.values, [90.0, 12.0, 1.0]);
        assert!(first.info.is_empty());

        let second = env.step(Action::Sell).expect("step 2");
        assert_eq!(env.state().cash_balance, 102.0);
        assert_eq!(env.state().shares_held, 0);
        assert_eq!(second.reward, 2.0);
        assert!(second.terminal);
        assert_eq!(second.observation.values, [102.0, 8.0, 0.0]);
        assert_eq!(env.status(), EnvStatus::Terminal);
    }

    #[test]
    fn unaffordable_buy_is_a_silent_noop() {
        let mut env = env(&[50.0, 60.0, 70.0], 40.0);
        env.reset();
        let before = (env.state().cash_balance, env.state().shares_held);
        let result = env.step(Action::Buy).expect("step");
        assert_eq!(before, (env.state().cash_balance, env.state().shares_held));
        assert_eq!(env.last_fill(), Fill::Rejected);
        assert_eq!(result.reward, 0.0);
    }

    #[test]
    fn sell_without_shares_is_a_silent_noop() {
        let mut env = env(&[5.0, 6.0, 7.0], 100.0);
        env.reset();
        env.step(Action::Sell).expect("step");
        assert_eq!(env.state().cash_balance, 100.0);
        assert_eq!(env.state().shares_held, 0);
        assert_eq!(env.state().current_step, 1);
    }

    #[test]
    fn reward_is_cumulative_not_incremental() {
        let mut env = env(&[10.0, 20.0, 30.0, 40.0], 100.0);
        env.reset();
        env.step(Action::Buy).expect("buy at 10");
        let held = env.step(Action::Hold).expect("hold at 20");
        assert_eq!(held.reward, 10.0);
        let held_again = env.step(Action::Hold).expect("hold at 30");
        assert_eq!(held_again.reward, 20.0);
        assert!(held_again.terminal);
    }

    #[test]
    fn step_after_terminal_is_rejected_until_reset() {
        let mut env = env(&[1.0, 2.0], 10.0);
        env.reset();
        let result = env.step(Action::Hold).expect("only step");
        assert!(result.terminal);
        assert_eq!(result.observation.price(), 2.0);
        assert_eq!(
            env.step(Action::Hold),
            Err(SimulationError::StepAfterTerminal { step: 1 })
        );

        env.reset();
        assert_eq!(env.status(), EnvStatus::Active);
        assert!(env.step(Action::Hold).is_ok());
    }

    #[test]
    fn render_logs_active_and_terminal_state() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut env = env(&[10.0, 12.0], 100.0);
            env.reset();
            env.render();
            env.step(Action::Buy).expect("step");
            env.render();
        });

        let lines: Vec<String> = captured.text().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("environment state"));
        assert!(lines[0].contains("step=0"));
        assert!(lines[0].contains("balance=100"));
        assert!(lines[0].contains("status=Active"));
        assert!(lines[1].contains("step=1"));
        assert!(lines[1].contains("shares_held=1"));
        assert!(lines[1].contains("status=Terminal"));
    }

    #[test]
    fn rejects_short_series_and_bad_balance() {
        let single = PriceSeries::new(vec![1.0]).expect("series");
        assert_eq!(
            TradingEnvironment::new(single, 10.0).err(),
            Some(SimulationError::InsufficientData {
                required: 2,
                actual: 1
            })
        );
        let pair = PriceSeries::new(vec![1.0, 2.0]).expect("series");
        assert!(matches!(
            TradingEnvironment::new(pair.clone(), 0.0),
            Err(SimulationError::InvalidInitialBalance(_))
        ));
        assert!(TradingEnvironment::new(pair, f64::NAN).is_err());
    }
}
