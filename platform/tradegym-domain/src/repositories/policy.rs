use crate::value_objects::observation::Observation;

/// Decision-making collaborator: maps an observation to a raw action code.
///
/// The code is returned undecoded so that a policy emitting something outside
/// {0, 1, 2} is caught by the driver instead of being coerced.
pub trait Policy {
    fn name(&self) -> &str;

    fn predict(&mut self, observation: &Observation) -> Result<i64, String>;
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn predict(&mut self, observation: &Observation) -> Result<i64, String> {
        (**self).predict(observation)
    }
}

/// Identifies the run a policy instance is created for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: String,
    pub symbol: String,
}

/// Process-wide policy resource, built once at startup and shared read-only.
/// Each simulation run gets its own policy instance from it.
pub trait PolicyFactory: Send + Sync {
    fn name(&self) -> &str;

    fn create(&self, context: &RunContext) -> Result<Box<dyn Policy + Send>, String>;
}
