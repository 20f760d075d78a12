//! OHLCV bar representation.

use chrono::NaiveDate;
use serde::Serialize;

/// One daily bar in the fixed downstream schema (date, open, high, low,
/// close, volume, ticker). Series are `Vec<OhlcvBar>` ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OhlcvBar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// All price fields are finite and volume is non-negative.
    pub fn is_complete(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite())
            && self.volume >= 0
    }
}

/// Sort ascending by date and drop duplicate dates (last row wins).
pub fn normalize_series(mut bars: Vec<OhlcvBar>) -> Vec<OhlcvBar> {
    bars.sort_by_key(|b| b.date);
    let mut out: Vec<OhlcvBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => out.push(bar),
        }
    }
    out
}
