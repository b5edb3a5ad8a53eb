use crate::errors::SimulationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete trading decision. The wire encoding is the integer code
/// (0 = hold, 1 = buy, 2 = sell); anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Hold,
    Buy,
    Sell,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Hold, Action::Buy, Action::Sell];

    pub fn code(self) -> i64 {
        match self {
            Action::Hold => 0,
            Action::Buy => 1,
            Action::Sell => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::Hold => "hold",
            Action::Buy => "buy",
            Action::Sell => "sell",
        }
    }
}

impl TryFrom<i64> for Action {
    type Error = SimulationError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Action::Hold),
            1 => Ok(Action::Buy),
            2 => Ok(Action::Sell),
            other => Err(SimulationError::InvalidAction(other)),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::Action;
    use crate::errors::SimulationError;

    #[test]
    fn codes_and_labels_match_wire_encoding() {
        for action in Action::ALL {
            assert_eq!(Action::try_from(action.code()), Ok(action));
        }
        assert_eq!(Action::Hold.label(), "hold");
        assert_eq!(Action::Buy.label(), "buy");
        assert_eq!(Action::Sell.label(), "sell");
    }

    #[test]
    fn out_of_range_codes_are_rejected() {
        assert_eq!(
            Action::try_from(3),
            Err(SimulationError::InvalidAction(3))
        );
        assert_eq!(
            Action::try_from(-1),
            Err(SimulationError::InvalidAction(-1))
        );
    }

    #[test]
    fn serializes_as_lowercase_label() {
        let json = serde_json::to_string(&Action::Sell).expect("serialize");
        assert_eq!(json, "\"sell\"");
    }
}
