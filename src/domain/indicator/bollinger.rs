//! Bollinger bands over closing prices.
//!
//! `middle` is the rolling mean of the last `period` closes and the bands sit
//! `mult` sample standard deviations (ddof = 1) either side of it, which is
//! how the `boll_ub`/`boll_lb` training features were produced. A window of
//! fewer than two closes has no sample deviation, so those points stay
//! invalid and the backfill supplies them.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULT_X100: u32 = 200;

/// Mean and sample standard deviation of `closes`; `None` below two samples.
fn mean_and_sample_std(closes: &[f64]) -> Option<(f64, f64)> {
    let n = closes.len();
    if n < 2 {
        return None;
    }
    let mean = closes.iter().sum::<f64>() / n as f64;
    let sum_sq: f64 = closes.iter().map(|c| (c - mean).powi(2)).sum();
    Some((mean, (sum_sq / (n - 1) as f64).sqrt()))
}

pub fn calculate_bollinger(
    bars: &[OhlcvBar],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Bollinger {
        period,
        stddev_mult_x100,
    };
    if period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let mult = f64::from(stddev_mult_x100) / 100.0;
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let band = (i + 1 >= period)
                .then(|| mean_and_sample_std(&closes[i + 1 - period..=i]))
                .flatten();
            let (valid, value) = match band {
                Some((middle, std)) => (
                    true,
                    IndicatorValue::Bollinger {
                        upper: middle + mult * std,
                        middle,
                        lower: middle - mult * std,
                    },
                ),
                None => (
                    false,
                    IndicatorValue::Bollinger {
                        upper: 0.0,
                        middle: 0.0,
                        lower: 0.0,
                    },
                ),
            };
            IndicatorPoint {
                date: bar.date,
                valid,
                value,
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn closes(prices: &[f64]) -> Vec<OhlcvBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                ticker: "BB".into(),
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 10,
            })
            .collect()
    }

    fn bands(series: &IndicatorSeries, i: usize) -> (f64, f64, f64) {
        match series.values[i].value {
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } => (upper, middle, lower),
            _ => panic!("not a bollinger point"),
        }
    }

    #[test]
    fn bands_use_sample_deviation() {
        // mean 20, sample std 10
        let series = calculate_bollinger(&closes(&[10.0, 20.0, 30.0]), 3, 200);
        let (upper, middle, lower) = bands(&series, 2);
        assert_relative_eq!(middle, 20.0);
        assert_relative_eq!(upper, 40.0);
        assert_relative_eq!(lower, 0.0);
    }

    #[test]
    fn window_slides_over_latest_closes() {
        // last window 2, 4, 4, 4, 5, 5, 7, 9: mean 5, sample variance 32/7
        let prices = [100.0, 2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let series = calculate_bollinger(&closes(&prices), 8, 100);
        assert!(!series.values[6].valid);
        let (upper, middle, lower) = bands(&series, 8);
        let std = (32.0f64 / 7.0).sqrt();
        assert_relative_eq!(middle, 5.0);
        assert_relative_eq!(upper, 5.0 + std, epsilon = 1e-12);
        assert_relative_eq!(lower, 5.0 - std, epsilon = 1e-12);
    }

    #[test]
    fn flat_prices_collapse_the_bands() {
        let series = calculate_bollinger(&closes(&[50.0; 4]), 2, DEFAULT_MULT_X100);
        assert!(!series.values[0].valid);
        let (upper, middle, lower) = bands(&series, 3);
        assert_relative_eq!(upper, 50.0);
        assert_relative_eq!(middle, 50.0);
        assert_relative_eq!(lower, 50.0);
    }

    #[test]
    fn single_close_window_is_never_valid() {
        let series = calculate_bollinger(&closes(&[1.0, 2.0, 3.0]), 1, DEFAULT_MULT_X100);
        assert_eq!(series.values.len(), 3);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn zero_period_yields_nothing() {
        assert!(calculate_bollinger(&closes(&[1.0, 2.0]), 0, 200).values.is_empty());
    }
}
