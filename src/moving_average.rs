//! Rolling simple moving averages over opening prices.

use crate::data::PriceSeries;
use crate::error::{BacktestError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

/// Rolling mean aligned to the dates of its source series.
///
/// `values[i]` is `None` for the first `window - 1` positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingAverageSeries {
    window: usize,
    dates: Vec<NaiveDate>,
    values: Vec<Option<f64>>,
}

impl MovingAverageSeries {
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values for an index range of the source series.
    ///
    /// Positions near the start of the range still average over bars before
    /// it, so a late slice is fully defined while an early one is not.
    pub fn slice(&self, range: Range<usize>) -> &[Option<f64>] {
        &self.values[range]
    }
}

/// Trailing means of `opens`, one per position.
pub fn rolling_mean_values(opens: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    if window == 0 {
        return Err(BacktestError::InvalidInput(
            "moving average window must be at least 1".to_string(),
        ));
    }

    let defined = opens
        .windows(window)
        .map(|w| Some(w.iter().sum::<f64>() / window as f64));

    let leading = (window - 1).min(opens.len());
    Ok(std::iter::repeat(None).take(leading).chain(defined).collect())
}

/// Rolling mean of `open` over `window` bars.
pub fn rolling_mean(series: &PriceSeries, window: usize) -> Result<MovingAverageSeries> {
    let values = rolling_mean_values(&series.opens(), window)?;
    Ok(MovingAverageSeries {
        window,
        dates: series.dates(),
        values,
    })
}

/// Rolling means for several windows, each computed once.
pub fn rolling_mean_cached(
    series: &PriceSeries,
    windows: impl IntoIterator<Item = usize>,
) -> Result<BTreeMap<usize, MovingAverageSeries>> {
    let mut cache = BTreeMap::new();
    for window in windows {
        if !cache.contains_key(&window) {
            cache.insert(window, rolling_mean(series, window)?);
        }
    }
    Ok(cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bar;

    fn series(opens: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = opens
            .iter()
            .enumerate()
            .map(|(i, &o)| Bar::from_open(start + chrono::Duration::days(i as i64), o))
            .collect();
        PriceSeries::new("TEST", bars).unwrap()
    }

    #[test]
    fn test_rolling_mean_basic() {
        let s = series(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let ma = rolling_mean(&s, 3).unwrap();

        assert_eq!(ma.window(), 3);
        assert_eq!(ma.len(), 5);
        assert_eq!(ma.values(), &[None, None, Some(2.0), Some(3.0), Some(4.0)]);
        assert_eq!(ma.dates()[4], s.last_date());
    }

    #[test]
    fn test_window_of_one_is_identity() {
        let s = series(&[3.0, 1.0, 4.0]);
        let ma = rolling_mean(&s, 1).unwrap();
        assert_eq!(ma.values(), &[Some(3.0), Some(1.0), Some(4.0)]);
    }

    #[test]
    fn test_window_longer_than_series() {
        let s = series(&[1.0, 2.0]);
        let ma = rolling_mean(&s, 5).unwrap();
        assert_eq!(ma.values(), &[None, None]);
    }

    #[test]
    fn test_zero_window_rejected() {
        let s = series(&[1.0, 2.0]);
        assert!(rolling_mean(&s, 0).is_err());
    }

    #[test]
    fn test_slice_looks_back_before_range() {
        let s = series(&[2.0, 4.0, 6.0, 8.0]);
        let ma = rolling_mean(&s, 2).unwrap();
        assert_eq!(ma.slice(1..3), &[Some(3.0), Some(5.0)]);
    }

    #[test]
    fn test_cached_computes_distinct_windows() {
        let s = series(&[1.0; 10]);
        let cache = rolling_mean_cached(&s, [2, 5, 2, 3]).unwrap();
        assert_eq!(cache.keys().copied().collect::<Vec<_>>(), vec![2, 3, 5]);
    }

    #[test]
    fn test_deterministic() {
        let s = series(&[1.1, 2.3, 0.7, 9.9, 4.2, 3.3]);
        assert_eq!(rolling_mean(&s, 3).unwrap(), rolling_mean(&s, 3).unwrap());
    }
}
