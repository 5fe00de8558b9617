//! Property-based tests using proptest.
//!
//! These tests verify that:
//! 1. Rolling means have the right undefined prefix and match a naive mean
//! 2. The simulator never holds cash and shares at the same time
//! 3. The simulator is a pure function of its inputs
//! 4. Walk-forward outcomes keep fold order and a deterministic winner

use chrono::NaiveDate;
use proptest::prelude::*;

use stockcross::data::PriceSeries;
use stockcross::moving_average::{rolling_mean, rolling_mean_values};
use stockcross::simulator::{simulate, Holding, Side};
use stockcross::types::{Bar, ParameterPair};
use stockcross::walkforward::{Fold, WalkForwardConfig, WalkForwardValidator};

fn series_from(opens: &[f64]) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    let bars = opens
        .iter()
        .enumerate()
        .map(|(i, &o)| Bar::from_open(start + chrono::Duration::days(i as i64), o))
        .collect();
    PriceSeries::new("PROP", bars).unwrap()
}

/// Random walk of positive prices.
fn price_path(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
    (1.0..500.0f64, prop::collection::vec(-0.05..0.05f64, len)).prop_map(|(start, steps)| {
        let mut price = start;
        steps
            .into_iter()
            .map(|r| {
                price = (price * (1.0 + r)).max(0.01);
                price
            })
            .collect()
    })
}

fn window_pair() -> impl Strategy<Value = (usize, usize)> {
    (1usize..15, 1usize..30).prop_map(|(short, gap)| (short, short + gap))
}

proptest! {
    #[test]
    fn prop_rolling_mean_prefix_and_values(opens in price_path(1..120), window in 1usize..40) {
        let series = series_from(&opens);
        let ma = rolling_mean(&series, window).unwrap();

        prop_assert_eq!(ma.len(), opens.len());
        let leading = ma.values().iter().take_while(|v| v.is_none()).count();
        prop_assert_eq!(leading, (window - 1).min(opens.len()));

        for (i, value) in ma.values().iter().enumerate().skip(window - 1) {
            let naive: f64 = opens[i + 1 - window..=i].iter().sum::<f64>() / window as f64;
            let v = value.unwrap();
            prop_assert!((v - naive).abs() <= 1e-9 * naive.abs().max(1.0));
        }
    }

    #[test]
    fn prop_single_position_invariant(opens in price_path(2..200), (short, long) in window_pair()) {
        let s = rolling_mean_values(&opens, short).unwrap();
        let l = rolling_mean_values(&opens, long).unwrap();
        let result = simulate(&opens, &s, &l, 100.0).unwrap();

        prop_assert!(result.final_cash == 0.0 || result.final_shares == 0.0);
        prop_assert!(result.final_cash > 0.0 || result.final_shares > 0.0);

        let mut expect = Side::Buy;
        for t in &result.transitions {
            prop_assert_eq!(t.side, expect);
            match t.holding {
                Holding::Cash(c) => prop_assert!(c > 0.0),
                Holding::Invested(s) => prop_assert!(s > 0.0),
            }
            prop_assert_eq!(t.holding.cash() == 0.0, t.holding.shares() != 0.0);
            expect = if expect == Side::Buy { Side::Sell } else { Side::Buy };
        }
        for w in result.transitions.windows(2) {
            prop_assert!(w[0].index < w[1].index);
        }
    }

    #[test]
    fn prop_simulator_idempotent(opens in price_path(2..150), (short, long) in window_pair()) {
        let s = rolling_mean_values(&opens, short).unwrap();
        let l = rolling_mean_values(&opens, long).unwrap();

        let first = simulate(&opens, &s, &l, 100.0).unwrap();
        let second = simulate(&opens, &s, &l, 100.0).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_validator_is_deterministic(opens in price_path(120..121)) {
        let series = series_from(&opens);
        let start = series.first_date();
        let day = |n: i64| start + chrono::Duration::days(n);
        let folds = vec![
            Fold::new(day(0), day(40), day(60)).unwrap(),
            Fold::new(day(20), day(60), day(80)).unwrap(),
            Fold::new(day(40), day(80), day(100)).unwrap(),
        ];
        let grid = vec![
            ParameterPair::new(2, 5).unwrap(),
            ParameterPair::new(3, 10).unwrap(),
            ParameterPair::new(5, 20).unwrap(),
        ];
        let validator = WalkForwardValidator::new(WalkForwardConfig::default());

        let a = validator.validate(&series, &folds, &grid).unwrap();
        let b = validator.validate(&series, &folds, &grid).unwrap();

        prop_assert_eq!(a.len(), 3);
        for (i, (x, y)) in a.iter().zip(&b).enumerate() {
            prop_assert_eq!(x.index, i);
            prop_assert_eq!(x.fold, folds[i]);
            prop_assert_eq!(x.best_pair, y.best_pair);
            prop_assert_eq!(x.test_yield, y.test_yield);

            let best = x.candidates.iter().map(|c| c.terminal_value).fold(f64::MIN, f64::max);
            let first_best = x.candidates.iter().find(|c| c.terminal_value == best).unwrap();
            prop_assert_eq!(x.best_pair, first_best.pair);
        }
    }
}
