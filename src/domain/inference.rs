//! Process-wide policy state with an explicit readiness flag.
//!
//! Built once at startup and shared behind an `Arc`. A failed load leaves
//! the engine `Unavailable`; every call then fails fast with
//! [`AdvisorError::InferenceUnavailable`] carrying the original reason.

use std::sync::Arc;

use tracing::{error, info};

use crate::domain::action::ActionVector;
use crate::domain::baseline::BaselineTable;
use crate::domain::error::AdvisorError;
use crate::domain::observation::{expected_len, Holdings, Observation, ObservationBuilder};
use crate::domain::universe::AssetUniverse;
use crate::ports::policy_port::Policy;

pub struct PolicyState {
    pub universe: AssetUniverse,
    pub baseline: BaselineTable,
    pub policy: Arc<dyn Policy>,
    pub initial_amount: f64,
}

pub enum InferenceEngine {
    Ready(PolicyState),
    Unavailable { reason: String },
}

impl InferenceEngine {
    /// Check the policy's declared shape against the universe and wrap it.
    pub fn ready(
        universe: AssetUniverse,
        baseline: BaselineTable,
        policy: Arc<dyn Policy>,
        initial_amount: f64,
    ) -> Result<Self, AdvisorError> {
        let n = universe.len();
        if policy.observation_dim() != expected_len(n) {
            return Err(AdvisorError::ObservationShape {
                expected: policy.observation_dim(),
                actual: expected_len(n),
            });
        }
        if policy.action_dim() != n {
            return Err(AdvisorError::ObservationShape {
                expected: n,
                actual: policy.action_dim(),
            });
        }
        if baseline.len() != n {
            return Err(AdvisorError::ObservationShape {
                expected: n,
                actual: baseline.len(),
            });
        }
        Ok(InferenceEngine::Ready(PolicyState {
            universe,
            baseline,
            policy,
            initial_amount,
        }))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        InferenceEngine::Unavailable {
            reason: reason.into(),
        }
    }

    /// Run `load` and keep whatever it produces; a failure is logged and
    /// recorded as the unavailable reason instead of propagating.
    pub fn load<F>(load: F) -> Self
    where
        F: FnOnce() -> Result<InferenceEngine, AdvisorError>,
    {
        match load() {
            Ok(engine) => {
                if let InferenceEngine::Ready(state) = &engine {
                    info!(
                        assets = state.universe.len(),
                        observation_dim = state.policy.observation_dim(),
                        "policy loaded"
                    );
                }
                engine
            }
            Err(e) => {
                error!(error = %e, "policy failed to load; recommendations disabled");
                InferenceEngine::unavailable(e.to_string())
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, InferenceEngine::Ready(_))
    }

    pub fn state(&self) -> Result<&PolicyState, AdvisorError> {
        match self {
            InferenceEngine::Ready(state) => Ok(state),
            InferenceEngine::Unavailable { reason } => Err(AdvisorError::InferenceUnavailable {
                reason: reason.clone(),
            }),
        }
    }

    pub fn universe(&self) -> Option<&AssetUniverse> {
        self.state().ok().map(|s| &s.universe)
    }

    /// Observation builder seeded with the baseline and a fresh account.
    pub fn observation_builder(&self) -> Result<ObservationBuilder<'_>, AdvisorError> {
        let state = self.state()?;
        ObservationBuilder::new(
            &state.universe,
            &state.baseline,
            Holdings::initial(state.initial_amount, state.universe.len()),
        )
    }

    /// Run the policy once on `observation`.
    pub fn infer(&self, observation: &Observation) -> Result<ActionVector, AdvisorError> {
        let state = self.state()?;
        let expected = expected_len(state.universe.len());
        if observation.len() != expected {
            return Err(AdvisorError::ObservationShape {
                expected,
                actual: observation.len(),
            });
        }
        let actions = state.policy.act(observation)?;
        if actions.len() != state.universe.len() {
            return Err(AdvisorError::ObservationShape {
                expected: state.universe.len(),
                actual: actions.len(),
            });
        }
        Ok(actions)
    }
}
