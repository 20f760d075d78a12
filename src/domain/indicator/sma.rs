//! Simple Moving Average of closes (`close_30_sma`, `close_60_sma`).
//!
//! Rolling-sum implementation; first (n-1) bars are warm-up.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Sma(period),
            values: Vec::new(),
        };
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut window_sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        window_sum += bar.close;
        if i >= period {
            window_sum -= bars[i - period].close;
        }
        let valid = i + 1 >= period;
        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: IndicatorValue::Simple(if valid {
                window_sum / period as f64
            } else {
                0.0
            }),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
