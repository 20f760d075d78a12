//! Pretrained policy port.

use crate::domain::action::ActionVector;
use crate::domain::error::AdvisorError;
use crate::domain::observation::Observation;

/// A deterministic decision function from observation to per-asset action.
///
/// Implementations hold no mutable state after construction, so a single
/// instance is shared by every in-flight request.
pub trait Policy: Send + Sync {
    fn observation_dim(&self) -> usize;
    fn action_dim(&self) -> usize;

    /// Run the policy on a single-row batch. Same input, same output.
    fn act(&self, observation: &Observation) -> Result<ActionVector, AdvisorError>;
}
