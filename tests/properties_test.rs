//! Property tests for the observation layout and action mapping.

use chrono::NaiveDate;
use proptest::prelude::*;
use proptest::test_runner::Config;
use std::collections::HashSet;
use tickerwise::domain::action::{classify, Action, ActionVector, BUY_THRESHOLD, SELL_THRESHOLD};
use tickerwise::domain::baseline::{BaselineTable, MarketRow};
use tickerwise::domain::indicator::transform::backfill;
use tickerwise::domain::indicator::{IndicatorKind, IndicatorSnapshot, INDICATOR_COUNT};
use tickerwise::domain::observation::{expected_len, Holdings, ObservationBuilder};
use tickerwise::domain::universe::AssetUniverse;

fn shuffled_tickers(max: usize) -> impl Strategy<Value = Vec<String>> {
    (1usize..max).prop_flat_map(|n| {
        Just((0..n).map(|i| format!("T{i}")).collect::<Vec<_>>()).prop_shuffle()
    })
}

fn row(ticker: &str, close: f64, fill: f64) -> MarketRow {
    MarketRow {
        ticker: ticker.to_string(),
        date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        close,
        volume: 100,
        indicators: IndicatorSnapshot::new([fill; INDICATOR_COUNT]),
    }
}

fn fixture(tickers: &[String]) -> (AssetUniverse, BaselineTable) {
    let universe = AssetUniverse::new(tickers.to_vec()).unwrap();
    let rows = tickers
        .iter()
        .enumerate()
        .map(|(i, t)| row(t, (i + 1) as f64, -((i + 1) as f64)))
        .collect();
    let baseline = BaselineTable::aligned(&universe, rows).unwrap();
    (universe, baseline)
}

proptest! {
    #![proptest_config(Config::with_cases(128))]

    #[test]
    fn classification_matches_thresholds(value in -1.0f64..=1.0) {
        let expected = if value > BUY_THRESHOLD {
            Action::Buy
        } else if value < SELL_THRESHOLD {
            Action::Sell
        } else {
            Action::Hold
        };
        prop_assert_eq!(classify(value), expected);
    }

    #[test]
    fn observation_length_is_one_plus_ten_n(
        tickers in shuffled_tickers(24),
        overlay_mask in proptest::collection::vec(any::<bool>(), 24),
    ) {
        let (universe, baseline) = fixture(&tickers);
        let n = universe.len();
        let mut builder =
            ObservationBuilder::new(&universe, &baseline, Holdings::initial(1_000_000.0, n)).unwrap();
        for (t, overlay) in tickers.iter().zip(&overlay_mask) {
            if *overlay {
                builder.overlay(&row(t, 999.0, 7.0)).unwrap();
            }
        }
        let obs = builder.build().unwrap();
        prop_assert_eq!(obs.len(), expected_len(n));
        prop_assert_eq!(obs.len(), 1 + 2 * n + 8 * n);
    }

    #[test]
    fn overlay_leaves_other_assets_at_baseline(
        tickers in shuffled_tickers(16),
        overlay_mask in proptest::collection::vec(any::<bool>(), 16),
    ) {
        let (universe, baseline) = fixture(&tickers);
        let n = universe.len();
        let mut builder =
            ObservationBuilder::new(&universe, &baseline, Holdings::initial(1_000_000.0, n)).unwrap();
        let overlaid: HashSet<&String> = tickers
            .iter()
            .zip(&overlay_mask)
            .filter(|(_, m)| **m)
            .map(|(t, _)| t)
            .collect();
        for t in &overlaid {
            builder.overlay(&row(t, 999.0, 7.0)).unwrap();
        }

        let obs = builder.build().unwrap();
        let values = obs.as_slice();
        for (i, t) in universe.tickers().iter().enumerate() {
            let (close, fill) = if overlaid.contains(t) {
                (999.0f32, 7.0f32)
            } else {
                ((i + 1) as f32, -((i + 1) as f32))
            };
            prop_assert_eq!(values[1 + n + i], close);
            for kind in IndicatorKind::ALL {
                prop_assert_eq!(values[1 + 2 * n + kind.position() * n + i], fill);
            }
        }
        // the shared baseline itself is never modified
        for (i, r) in baseline.rows().iter().enumerate() {
            prop_assert_eq!(r.close, (i + 1) as f64);
        }
    }

    #[test]
    fn action_lookup_is_a_bijection(tickers in shuffled_tickers(32)) {
        let universe = AssetUniverse::new(tickers.clone()).unwrap();
        let n = universe.len();
        let values: Vec<f64> = (0..n).map(|i| i as f64 / n as f64).collect();
        let actions = ActionVector::clamped(values.clone());

        let mut seen = HashSet::new();
        for t in &tickers {
            let idx = universe.index_of(t).unwrap();
            prop_assert_eq!(&universe.tickers()[idx], t);
            let v = actions.value_for(&universe, t).unwrap();
            prop_assert_eq!(v, values[idx]);
            prop_assert!(seen.insert(idx));
        }
        prop_assert_eq!(seen.len(), n);
        prop_assert!(actions.value_for(&universe, "NOT_IN_UNIVERSE").is_err());
    }

    #[test]
    fn backfill_keeps_defined_values_and_fills_leading_gaps(
        column in proptest::collection::vec(proptest::option::of(-100.0f64..100.0), 0..64),
    ) {
        let filled = backfill(&column);
        prop_assert_eq!(filled.len(), column.len());
        for (orig, out) in column.iter().zip(&filled) {
            if orig.is_some() {
                prop_assert_eq!(orig, out);
            }
        }
        if let Some(last_defined) = column.iter().rposition(Option::is_some) {
            prop_assert!(filled[..=last_defined].iter().all(Option::is_some));
            prop_assert!(filled[last_defined + 1..].iter().all(Option::is_none));
        } else {
            prop_assert!(filled.iter().all(Option::is_none));
        }
    }
}
