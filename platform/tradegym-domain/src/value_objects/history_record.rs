use crate::value_objects::action::Action;
use serde::{Deserialize, Serialize};

/// One completed step of a simulation run, as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub step: usize,
    pub price: f64,
    /// Integer action code (0/1/2).
    pub action: i64,
    pub action_name: String,
    pub net_worth: f64,
}

impl HistoryRecord {
    pub fn new(step: usize, price: f64, action: Action, net_worth: f64) -> Self {
        Self {
            step,
            price,
            action: action.code(),
            action_name: action.label().to_string(),
            net_worth,
        }
    }
}
