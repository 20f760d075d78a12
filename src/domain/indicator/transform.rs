//! OHLCV series → backfilled indicator history for the model feature set.
//!
//! Warm-up rows (insufficient trailing samples) are filled *backward* from
//! the first defined value of each column. Values are never carried
//! forward, so no row ever sees a value computed from a later date than the
//! first defined one.

use chrono::NaiveDate;

use crate::domain::error::AdvisorError;
use crate::domain::indicator::{
    bollinger, cci, dx, macd, rsi, sma, IndicatorKind, IndicatorSnapshot, IndicatorValue,
    INDICATOR_COUNT,
};
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: i64,
    pub indicators: IndicatorSnapshot,
}

/// Full indicator history for one ticker; never empty.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    pub ticker: String,
    pub rows: Vec<IndicatorRow>,
}

impl IndicatorFrame {
    pub fn latest(&self) -> &IndicatorRow {
        // compute_frame rejects empty input, so rows always has one element
        &self.rows[self.rows.len() - 1]
    }
}

/// Replace each `None` with the next defined value after it.
///
/// Trailing `None`s with no defined successor stay `None`.
pub fn backfill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = values.to_vec();
    let mut next: Option<f64> = None;
    for slot in out.iter_mut().rev() {
        match slot {
            Some(v) => next = Some(*v),
            None => *slot = next,
        }
    }
    out
}

/// Raw indicator columns in [`IndicatorKind::ALL`] order, `None` during warm-up.
pub fn raw_columns(bars: &[OhlcvBar]) -> [Vec<Option<f64>>; INDICATOR_COUNT] {
    let boll = bollinger::calculate_bollinger(
        bars,
        bollinger::DEFAULT_PERIOD,
        bollinger::DEFAULT_MULT_X100,
    );

    IndicatorKind::ALL.map(|kind| match kind {
        IndicatorKind::Macd => macd::calculate_macd_default(bars).project(|v| match v {
            IndicatorValue::Macd { line, .. } => *line,
            _ => f64::NAN,
        }),
        IndicatorKind::Rsi30 => rsi::calculate_rsi(bars, rsi::DEFAULT_PERIOD).simple_values(),
        IndicatorKind::Cci30 => cci::calculate_cci(bars, cci::DEFAULT_PERIOD).simple_values(),
        IndicatorKind::BollUb => boll.project(|v| match v {
            IndicatorValue::Bollinger { upper, .. } => *upper,
            _ => f64::NAN,
        }),
        IndicatorKind::BollLb => boll.project(|v| match v {
            IndicatorValue::Bollinger { lower, .. } => *lower,
            _ => f64::NAN,
        }),
        IndicatorKind::Dx30 => dx::calculate_dx(bars, dx::DEFAULT_PERIOD).simple_values(),
        IndicatorKind::Close30Sma => sma::calculate_sma(bars, 30).simple_values(),
        IndicatorKind::Close60Sma => sma::calculate_sma(bars, 60).simple_values(),
    })
}

/// Compute the backfilled indicator history for `bars` (ascending by date).
pub fn compute_frame(ticker: &str, bars: &[OhlcvBar]) -> Result<IndicatorFrame, AdvisorError> {
    if bars.is_empty() {
        return Err(AdvisorError::data_unavailable(ticker, "empty price series"));
    }

    let columns = raw_columns(bars).map(|col| backfill(&col));

    for (kind, column) in IndicatorKind::ALL.iter().zip(&columns) {
        if column.iter().any(Option::is_none) {
            return Err(AdvisorError::data_unavailable(
                ticker,
                format!(
                    "{} bars are not enough history to compute {}",
                    bars.len(),
                    kind
                ),
            ));
        }
    }

    let rows = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let mut indicators = IndicatorSnapshot::default();
            for (kind, column) in IndicatorKind::ALL.iter().zip(&columns) {
                indicators.set(*kind, column[i].unwrap_or(f64::NAN));
            }
            IndicatorRow {
                date: bar.date,
                close: bar.close,
                volume: bar.volume,
                indicators,
            }
        })
        .collect();

    Ok(IndicatorFrame {
        ticker: ticker.to_string(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series(n: usize) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.1;
                OhlcvBar {
                    ticker: "AAPL".into(),
                    date: start + Duration::days(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000 + i as i64,
                }
            })
            .collect()
    }

    #[test]
    fn backfill_fills_leading_with_first_defined() {
        let v = 7.25;
        let input = vec![None, None, None, None, None, Some(v), Some(9.0)];
        let out = backfill(&input);
        assert_eq!(&out[..5], &[Some(v); 5]);
        assert_eq!(out[6], Some(9.0));
    }

    #[test]
    fn backfill_never_forward_fills() {
        let out = backfill(&[Some(1.0), None, Some(3.0), None]);
        // interior gap takes the *next* value, trailing gap stays undefined
        assert_eq!(out, vec![Some(1.0), Some(3.0), Some(3.0), None]);
    }

    #[test]
    fn empty_series_is_data_unavailable() {
        let err = compute_frame("AAPL", &[]).unwrap_err();
        assert!(matches!(err, AdvisorError::DataUnavailable { .. }));
    }

    #[test]
    fn short_series_cannot_fill_60_day_average() {
        let err = compute_frame("AAPL", &series(40)).unwrap_err();
        assert!(err.to_string().contains("close_60_sma"));
    }

    #[test]
    fn frame_has_a_row_per_bar_with_defined_values() {
        let bars = series(80);
        let frame = compute_frame("AAPL", &bars).unwrap();
        assert_eq!(frame.rows.len(), 80);
        for row in &frame.rows {
            for (_, v) in row.indicators.iter() {
                assert!(v.is_finite());
            }
        }
        assert_eq!(frame.latest().date, bars[79].date);
        assert_eq!(frame.latest().close, bars[79].close);
    }

    #[test]
    fn leading_rows_equal_first_defined_sma60() {
        let bars = series(80);
        let frame = compute_frame("AAPL", &bars).unwrap();
        let first_defined = frame.rows[59].indicators.get(IndicatorKind::Close60Sma);
        for row in &frame.rows[..59] {
            assert_eq!(row.indicators.get(IndicatorKind::Close60Sma), first_defined);
        }
    }
}
