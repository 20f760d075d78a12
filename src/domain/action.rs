//! Policy output and its discrete interpretation.

use serde::Serialize;
use std::fmt;

use crate::domain::error::AdvisorError;
use crate::domain::universe::AssetUniverse;

pub const BUY_THRESHOLD: f64 = 0.05;
pub const SELL_THRESHOLD: f64 = -0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// BUY above 0.05, SELL below -0.05, HOLD otherwise (both bounds are HOLD).
pub fn classify(value: f64) -> Action {
    if value > BUY_THRESHOLD {
        Action::Buy
    } else if value < SELL_THRESHOLD {
        Action::Sell
    } else {
        Action::Hold
    }
}

/// One action value per asset, universe order, each in [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ActionVector {
    values: Vec<f64>,
}

impl ActionVector {
    /// Clamp each value into [-1, 1]. NaN maps to 0.
    pub fn clamped(values: Vec<f64>) -> Self {
        let values = values
            .into_iter()
            .map(|v| if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) })
            .collect();
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Action value for `ticker`, looked up through its universe index.
    pub fn value_for(&self, universe: &AssetUniverse, ticker: &str) -> Result<f64, AdvisorError> {
        let idx = universe
            .index_of(ticker)
            .ok_or_else(|| AdvisorError::UnknownTicker(ticker.to_string()))?;
        self.values
            .get(idx)
            .copied()
            .ok_or(AdvisorError::ObservationShape {
                expected: universe.len(),
                actual: self.values.len(),
            })
    }
}
