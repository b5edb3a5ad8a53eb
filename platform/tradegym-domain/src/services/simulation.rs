use crate::errors::SimulationError;
use crate::repositories::policy::Policy;
use crate::services::environment::{Environment, Fill, TradingEnvironment};
use crate::value_objects::action::Action;
use crate::value_objects::history_record::HistoryRecord;
use crate::value_objects::price_series::PriceSeries;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub initial_balance: f64,
    pub final_balance: f64,
    pub profit: f64,
    pub profit_percent: f64,
}

impl Summary {
    fn from_final_net_worth(initial_balance: f64, final_balance: f64) -> Self {
        let profit = final_balance - initial_balance;
        Self {
            initial_balance,
            final_balance,
            profit,
            profit_percent: profit / initial_balance * 100.0,
        }
    }
}

/// Per-run counters, not part of the reported summary.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub steps: usize,
    pub buys: usize,
    pub sells: usize,
    pub rejected_orders: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub history: Vec<HistoryRecord>,
    pub summary: Summary,
    pub stats: RunStats,
}

/// Replays a policy against a fresh trading environment until it reports a
/// terminal step.
pub struct SimulationRunner<P: Policy> {
    policy: P,
    env: TradingEnvironment,
}

impl<P: Policy> SimulationRunner<P> {
    pub fn new(
        policy: P,
        prices: PriceSeries,
        initial_balance: f64,
    ) -> Result<Self, SimulationError> {
        let env = TradingEnvironment::new(prices, initial_balance)?;
        Ok(Self { policy, env })
    }

    pub fn environment(&self) -> &TradingEnvironment {
        &self.env
    }

    pub fn run(&mut self) -> Result<SimulationResult, SimulationError> {
        let mut observation = self.env.reset();
        let mut history = Vec::with_capacity(self.env.prices().len().saturating_sub(1));
        let mut stats = RunStats::default();

        loop {
            let code = self
                .policy
                .predict(&observation)
                .map_err(SimulationError::Policy)?;
            let action = Action::try_from(code)?;

            let result = self.env.step(action)?;

            // Valued at the post-advance index, so the last record carries the
            // final price of the series.
            let step = self.env.state().current_step;
            let price = self.env.prices().price_at_or_last(step);
            let net_worth = self.env.state().net_worth(price);
            history.push(HistoryRecord::new(step, price, action, net_worth));

            stats.steps += 1;
            match (action, self.env.last_fill()) {
                (Action::Buy, Fill::Executed) => stats.buys += 1,
                (Action::Sell, Fill::Executed) => stats.sells += 1,
                (_, Fill::Rejected) => stats.rejected_orders += 1,
                _ => {}
            }

            observation = result.observation;
            if result.terminal {
                break;
            }
        }

        let initial_balance = self.env.initial_balance();
        let final_balance = history
            .last()
            .map(|record| record.net_worth)
            .unwrap_or(initial_balance);
        tracing::debug!(
            policy = self.policy.name(),
            steps = stats.steps,
            buys = stats.buys,
            sells = stats.sells,
            rejected = stats.rejected_orders,
            final_balance,
            "simulation finished"
        );

        Ok(SimulationResult {
            history,
            summary: Summary::from_final_net_worth(initial_balance, final_balance),
            stats,
        })
    }
}
