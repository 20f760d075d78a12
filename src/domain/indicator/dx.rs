//! Directional Movement Index (`dx_30`).
//!
//! +DM = up move when it exceeds the down move and is positive, else 0
//! -DM = down move when it exceeds the up move and is positive, else 0
//! +DI / -DI = 100 * Wilder(+DM or -DM) / Wilder(TR)
//! DX = 100 * |+DI - -DI| / (+DI + -DI), 0 when both are 0
//!
//! Wilder smoothing is seeded with the mean of the first n values, so the
//! first n bars (n directional changes) are warm-up.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 30;

pub fn calculate_dx(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Dx(period),
            values: Vec::new(),
        };
    }

    let mut values = Vec::with_capacity(bars.len());
    let (mut plus_sm, mut minus_sm, mut tr_sm) = (0.0, 0.0, 0.0);
    let n = period as f64;

    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            values.push(IndicatorPoint {
                date: bar.date,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
            continue;
        }

        let prev = &bars[i - 1];
        let up = bar.high - prev.high;
        let down = prev.low - bar.low;
        let plus_dm = if up > down && up > 0.0 { up } else { 0.0 };
        let minus_dm = if down > up && down > 0.0 { down } else { 0.0 };
        let tr = bar.true_range(prev.close);

        if i <= period {
            plus_sm += plus_dm / n;
            minus_sm += minus_dm / n;
            tr_sm += tr / n;
        } else {
            plus_sm = (plus_sm * (n - 1.0) + plus_dm) / n;
            minus_sm = (minus_sm * (n - 1.0) + minus_dm) / n;
            tr_sm = (tr_sm * (n - 1.0) + tr) / n;
        }

        let valid = i >= period;
        let dx = if valid { directional_index(plus_sm, minus_sm, tr_sm) } else { 0.0 };
        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: IndicatorValue::Simple(dx),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Dx(period),
        values,
    }
}

fn directional_index(plus_sm: f64, minus_sm: f64, tr_sm: f64) -> f64 {
    if tr_sm == 0.0 {
        return 0.0;
    }
    let plus_di = 100.0 * plus_sm / tr_sm;
    let minus_di = 100.0 * minus_sm / tr_sm;
    let sum = plus_di + minus_di;
    if sum == 0.0 {
        0.0
    } else {
        100.0 * (plus_di - minus_di).abs() / sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn bar(i: usize, high: f64, low: f64) -> OhlcvBar {
        OhlcvBar {
            ticker: "TEST".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i as i64),
            open: (high + low) / 2.0,
            high,
            low,
            close: (high + low) / 2.0,
            volume: 1,
        }
    }

    #[test]
    fn dx_pure_uptrend_is_100() {
        let bars: Vec<OhlcvBar> = (0..10)
            .map(|i| bar(i, 10.0 + i as f64, 8.0 + i as f64))
            .collect();
        let series = calculate_dx(&bars, 3);
        let last = series.simple_values()[9].unwrap();
        assert!((last - 100.0).abs() < 1e-9);
    }

    #[test]
    fn dx_flat_market_is_zero() {
        let bars: Vec<OhlcvBar> = (0..6).map(|i| bar(i, 10.0, 10.0)).collect();
        let series = calculate_dx(&bars, 3);
        assert_eq!(series.simple_values()[5], Some(0.0));
    }

    #[test]
    fn dx_warmup_is_period_bars() {
        let bars: Vec<OhlcvBar> = (0..6).map(|i| bar(i, 10.0 + i as f64, 9.0)).collect();
        let series = calculate_dx(&bars, 3);
        assert!(!series.values[2].valid);
        assert!(series.values[3].valid);
    }

    #[test]
    fn dx_bounded() {
        let bars: Vec<OhlcvBar> = (0..40)
            .map(|i| {
                let wiggle = ((i % 5) as f64 - 2.0) * 1.5;
                bar(i, 50.0 + wiggle + 1.0, 50.0 + wiggle - 1.0)
            })
            .collect();
        let series = calculate_dx(&bars, DEFAULT_PERIOD);
        for v in series.simple_values().into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v));
        }
    }
}
