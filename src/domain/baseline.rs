//! Universe-wide market snapshot used as the base layer of every observation.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::error::AdvisorError;
use crate::domain::indicator::transform::IndicatorRow;
use crate::domain::indicator::IndicatorSnapshot;
use crate::domain::universe::AssetUniverse;

/// One ticker's close, volume and indicator values on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRow {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
    pub volume: i64,
    pub indicators: IndicatorSnapshot,
}

impl MarketRow {
    pub fn from_indicator_row(ticker: &str, row: &IndicatorRow) -> Self {
        Self {
            ticker: ticker.to_string(),
            date: row.date,
            close: row.close,
            volume: row.volume,
            indicators: row.indicators,
        }
    }
}

/// Latest-date rows for the whole universe, stored in universe order.
#[derive(Debug, Clone)]
pub struct BaselineTable {
    rows: Vec<MarketRow>,
}

impl BaselineTable {
    /// Place each row at its ticker's universe index.
    ///
    /// Rows for tickers outside the universe are rejected, as is any
    /// universe member without a row. A repeated ticker keeps the last row.
    pub fn aligned(universe: &AssetUniverse, rows: Vec<MarketRow>) -> Result<Self, AdvisorError> {
        let mut slots: Vec<Option<MarketRow>> = vec![None; universe.len()];
        for row in rows {
            let idx = universe
                .index_of(&row.ticker)
                .ok_or_else(|| AdvisorError::UnknownTicker(row.ticker.clone()))?;
            slots[idx] = Some(row);
        }

        let mut placed = Vec::with_capacity(slots.len());
        for (ticker, slot) in universe.tickers().iter().zip(slots) {
            match slot {
                Some(row) => placed.push(row),
                None => {
                    return Err(AdvisorError::data_unavailable(
                        ticker,
                        "no baseline row at the latest training date",
                    ));
                }
            }
        }
        Ok(Self { rows: placed })
    }

    pub fn rows(&self) -> &[MarketRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&MarketRow> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
