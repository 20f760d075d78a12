//! Observation vector assembly.
//!
//! Layout, for a universe of `n` assets and `k` indicators:
//!
//! ```text
//! [cash] ++ [shares; n] ++ [close; n] ++ [indicator_0; n] ++ ... ++ [indicator_{k-1}; n]
//! ```
//!
//! Each per-asset block is in universe order, and indicator blocks follow
//! [`IndicatorKind::ALL`]. Values are stored as `f32`, the precision the
//! policy was trained with.

use crate::domain::baseline::{BaselineTable, MarketRow};
use crate::domain::error::AdvisorError;
use crate::domain::indicator::{IndicatorKind, INDICATOR_COUNT};
use crate::domain::universe::AssetUniverse;

/// Cash balance of the training environment's initial state.
pub const INITIAL_AMOUNT: f64 = 1_000_000.0;

/// `1 + 2n + k·n` for a universe of `n` assets.
pub fn expected_len(universe_size: usize) -> usize {
    1 + 2 * universe_size + INDICATOR_COUNT * universe_size
}

#[derive(Debug, Clone, PartialEq)]
pub struct Holdings {
    pub cash: f64,
    /// Shares per asset, universe order.
    pub shares: Vec<f64>,
}

impl Holdings {
    /// Fresh account: `cash` and no positions.
    pub fn initial(cash: f64, universe_size: usize) -> Self {
        Self {
            cash,
            shares: vec![0.0; universe_size],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    values: Vec<f32>,
}

impl Observation {
    /// Wrap raw values, rejecting any length other than `expected`.
    pub fn from_values(values: Vec<f32>, expected: usize) -> Result<Self, AdvisorError> {
        if values.len() != expected {
            return Err(AdvisorError::ObservationShape {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self { values })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Baseline rows plus per-request overlays.
///
/// Each builder owns a private copy of the baseline, so overlays never
/// touch the process-wide table.
#[derive(Debug, Clone)]
pub struct ObservationBuilder<'a> {
    universe: &'a AssetUniverse,
    rows: Vec<MarketRow>,
    holdings: Holdings,
}

impl<'a> ObservationBuilder<'a> {
    pub fn new(
        universe: &'a AssetUniverse,
        baseline: &BaselineTable,
        holdings: Holdings,
    ) -> Result<Self, AdvisorError> {
        let n = universe.len();
        if baseline.len() != n || holdings.shares.len() != n {
            return Err(AdvisorError::ObservationShape {
                expected: expected_len(n),
                actual: 1 + holdings.shares.len() + (1 + INDICATOR_COUNT) * baseline.len(),
            });
        }
        Ok(Self {
            universe,
            rows: baseline.rows().to_vec(),
            holdings,
        })
    }

    /// Replace one asset's close and indicator fields with fresher values.
    pub fn overlay(&mut self, fresh: &MarketRow) -> Result<(), AdvisorError> {
        let idx = self
            .universe
            .index_of(&fresh.ticker)
            .ok_or_else(|| AdvisorError::UnknownTicker(fresh.ticker.clone()))?;
        let row = &mut self.rows[idx];
        row.date = fresh.date;
        row.close = fresh.close;
        row.volume = fresh.volume;
        row.indicators = fresh.indicators;
        Ok(())
    }

    pub fn build(&self) -> Result<Observation, AdvisorError> {
        let n = self.universe.len();
        let mut values = Vec::with_capacity(expected_len(n));

        values.push(self.holdings.cash as f32);
        values.extend(self.holdings.shares.iter().map(|&s| s as f32));
        values.extend(self.rows.iter().map(|r| r.close as f32));
        for kind in IndicatorKind::ALL {
            values.extend(self.rows.iter().map(|r| r.indicators.get(kind) as f32));
        }

        Observation::from_values(values, expected_len(n))
    }
}
