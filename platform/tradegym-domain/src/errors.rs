use thiserror::Error;

/// Failures that abort a simulation run. A run either completes with a full
/// history or fails with one of these and returns nothing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("insufficient price data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid action code {0} (expected 0=hold, 1=buy, 2=sell)")]
    InvalidAction(i64),

    #[error("step called on a terminal environment (current_step={step}); call reset first")]
    StepAfterTerminal { step: usize },

    #[error("initial balance must be a finite value > 0, got {0}")]
    InvalidInitialBalance(f64),

    #[error("invalid price at index {index}: {value}")]
    InvalidPrice { index: usize, value: f64 },

    #[error("policy failed: {0}")]
    Policy(String),
}

impl SimulationError {
    /// True for failures caused by the caller's input rather than by the
    /// policy or the engine.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SimulationError::InsufficientData { .. }
                | SimulationError::InvalidInitialBalance(_)
                | SimulationError::InvalidPrice { .. }
        )
    }
}
