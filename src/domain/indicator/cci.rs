//! Commodity Channel Index (`cci_30`).
//!
//! TP = (H + L + C) / 3
//! CCI = (TP - SMA_n(TP)) / (0.015 * MeanDeviation_n(TP))
//!
//! A flat window (mean deviation 0) reads 0. First (n-1) bars are warm-up.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 30;
const LAMBERT_CONSTANT: f64 = 0.015;

pub fn calculate_cci(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Cci(period),
            values: Vec::new(),
        };
    }

    let typical: Vec<f64> = bars.iter().map(OhlcvBar::typical_price).collect();
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if i + 1 < period {
            values.push(IndicatorPoint {
                date: bar.date,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
            continue;
        }

        let window = &typical[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let mean_dev = window.iter().map(|tp| (tp - mean).abs()).sum::<f64>() / period as f64;
        let cci = if mean_dev == 0.0 {
            0.0
        } else {
            (typical[i] - mean) / (LAMBERT_CONSTANT * mean_dev)
        };

        values.push(IndicatorPoint {
            date: bar.date,
            valid: true,
            value: IndicatorValue::Simple(cci),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Cci(period),
        values,
    }
}
