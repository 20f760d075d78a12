//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the SMA of the first n closes, then
//! EMA[i] = C[i]*k + EMA[i-1]*(1-k). First (n-1) bars are warm-up.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ema(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries {
            indicator_type: IndicatorType::Ema(period),
            values: Vec::new(),
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let values = ema_over(&closes, period)
        .into_iter()
        .zip(bars)
        .map(|(ema, bar)| IndicatorPoint {
            date: bar.date,
            valid: ema.is_some(),
            value: IndicatorValue::Simple(ema.unwrap_or(0.0)),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

/// EMA over an arbitrary sequence; `None` during warm-up.
pub(crate) fn ema_over(input: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(input.len());
    if period == 0 {
        out.resize(input.len(), None);
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, &x) in input.iter().enumerate() {
        if i < period - 1 {
            sum += x;
            out.push(None);
        } else if i == period - 1 {
            sum += x;
            ema = sum / period as f64;
            out.push(Some(ema));
        } else {
            ema = x * k + ema * (1.0 - k);
            out.push(Some(ema));
        }
    }
    out
}
