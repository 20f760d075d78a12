//! RSI (Relative Strength Index) with Wilder's smoothing.
//!
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss)); 100 when avg_loss == 0.
//! The first n bars are warm-up.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 30;

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let warmup = |bar: &OhlcvBar| IndicatorPoint {
        date: bar.date,
        valid: false,
        value: IndicatorValue::Simple(0.0),
    };

    if period == 0 || bars.len() < 2 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values: bars.iter().map(warmup).collect(),
        };
    }

    let mut values = Vec::with_capacity(bars.len());
    values.push(warmup(&bars[0]));

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    let mut seed_gain = 0.0;
    let mut seed_loss = 0.0;

    for (i, bar) in bars.iter().enumerate().skip(1) {
        let change = bar.close - bars[i - 1].close;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        let n = i; // number of changes seen so far

        if n < period {
            seed_gain += gain;
            seed_loss += loss;
            values.push(warmup(bar));
            continue;
        }

        if n == period {
            avg_gain = (seed_gain + gain) / period as f64;
            avg_loss = (seed_loss + loss) / period as f64;
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        }

        let rsi = if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
        };
        values.push(IndicatorPoint {
            date: bar.date,
            valid: true,
            value: IndicatorValue::Simple(rsi),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}
