//! Actor network exported to JSON.
//!
//! ```json
//! {"observation_dim": 41, "action_dim": 4,
//!  "layers": [{"weights": [[...], ...], "bias": [...], "activation": "relu"}, ...]}
//! ```
//!
//! `weights` is row-major `[out][in]`. The forward pass yields the mean
//! action directly; nothing is sampled.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::domain::action::ActionVector;
use crate::domain::error::AdvisorError;
use crate::domain::observation::Observation;
use crate::ports::policy_port::Policy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Tanh,
    #[serde(alias = "identity", alias = "none")]
    Linear,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Linear => x,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

impl DenseLayer {
    fn input_dim(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    fn output_dim(&self) -> usize {
        self.weights.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| {
                let z: f64 = row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + b;
                self.activation.apply(z)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MlpPolicy {
    observation_dim: usize,
    action_dim: usize,
    layers: Vec<DenseLayer>,
}

impl MlpPolicy {
    pub fn from_file(path: &Path) -> Result<Self, AdvisorError> {
        let origin = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| AdvisorError::Artifact {
            path: origin.clone(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content, &origin)
    }

    pub fn from_json(content: &str, origin: &str) -> Result<Self, AdvisorError> {
        let policy: MlpPolicy =
            serde_json::from_str(content).map_err(|e| AdvisorError::Artifact {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;
        policy.validate().map_err(|reason| AdvisorError::Artifact {
            path: origin.to_string(),
            reason,
        })?;
        debug!(
            path = origin,
            layers = policy.layers.len(),
            observation_dim = policy.observation_dim,
            action_dim = policy.action_dim,
            "policy artifact parsed"
        );
        Ok(policy)
    }

    /// Every layer must be rectangular and chain into the next.
    fn validate(&self) -> Result<(), String> {
        if self.layers.is_empty() {
            return Err("network has no layers".to_string());
        }
        let mut width = self.observation_dim;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.output_dim() == 0 {
                return Err(format!("layer {} has no outputs", i));
            }
            if layer.weights.iter().any(|row| row.len() != layer.input_dim()) {
                return Err(format!("layer {} weights are ragged", i));
            }
            if layer.input_dim() != width {
                return Err(format!(
                    "layer {} expects {} inputs, previous width is {}",
                    i,
                    layer.input_dim(),
                    width
                ));
            }
            if layer.bias.len() != layer.output_dim() {
                return Err(format!(
                    "layer {} has {} biases for {} outputs",
                    i,
                    layer.bias.len(),
                    layer.output_dim()
                ));
            }
            width = layer.output_dim();
        }
        if width != self.action_dim {
            return Err(format!(
                "network emits {} values, action_dim is {}",
                width, self.action_dim
            ));
        }
        Ok(())
    }
}

impl Policy for MlpPolicy {
    fn observation_dim(&self) -> usize {
        self.observation_dim
    }

    fn action_dim(&self) -> usize {
        self.action_dim
    }

    fn act(&self, observation: &Observation) -> Result<ActionVector, AdvisorError> {
        if observation.len() != self.observation_dim {
            return Err(AdvisorError::ObservationShape {
                expected: self.observation_dim,
                actual: observation.len(),
            });
        }
        let mut activations: Vec<f64> = observation.as_slice().iter().map(|&v| f64::from(v)).collect();
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }
        Ok(ActionVector::clamped(activations))
    }
}
