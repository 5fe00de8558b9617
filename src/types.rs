//! Core data types for the crossover backtester.

use crate::error::{BacktestError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Daily OHLCV bar. Only `open` drives the strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Create a bar where every price field equals `open`.
    ///
    /// Handy when a provider only reports opening prices.
    pub fn from_open(date: NaiveDate, open: f64) -> Self {
        Self::new(date, open, open, open, open, 0.0)
    }

    /// Whether the open price is usable: finite and strictly positive.
    pub fn validate(&self) -> bool {
        self.open.is_finite() && self.open > 0.0
    }
}

/// A (short, long) moving-average window pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterPair {
    pub short: usize,
    pub long: usize,
}

impl ParameterPair {
    /// Create a validated pair; `short` must be at least 1 and below `long`.
    pub fn new(short: usize, long: usize) -> Result<Self> {
        if short == 0 || short >= long {
            return Err(BacktestError::InvalidParameterPair { short, long });
        }
        Ok(Self { short, long })
    }
}

impl fmt::Display for ParameterPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.short, self.long)
    }
}

/// Fractional years between two dates.
///
/// Whole calendar years are counted first so that anniversaries come out
/// exact (2020-07-01 to 2025-07-01 is 5.0); leftover days use 365.25.
pub fn years_between(start: NaiveDate, end: NaiveDate) -> f64 {
    if end <= start {
        return -years_between(end, start);
    }

    let whole = end.years_since(start).unwrap_or(0);
    let anniversary = shift_years(start, whole as i32);
    let rest_days = (end - anniversary).num_days() as f64;

    whole as f64 + rest_days / 365.25
}

/// Move a date by whole years, clamping Feb 29 to Feb 28.
fn shift_years(date: NaiveDate, years: i32) -> NaiveDate {
    let year = date.year() + years;
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), 28))
        .unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_bar_validation() {
        let bar = Bar::new(d(2024, 1, 2), 10.0, 11.0, 9.0, 10.5, 1000.0);
        assert!(bar.validate());

        let bad = Bar::new(d(2024, 1, 2), 0.0, 11.0, 9.0, 10.5, 1000.0);
        assert!(!bad.validate());
        assert!(!Bar::from_open(d(2024, 1, 2), f64::NAN).validate());
        assert!(!Bar::from_open(d(2024, 1, 2), -1.0).validate());
    }

    #[test]
    fn test_parameter_pair_validation() {
        assert!(ParameterPair::new(10, 50).is_ok());
        assert!(matches!(
            ParameterPair::new(50, 50),
            Err(BacktestError::InvalidParameterPair { short: 50, long: 50 })
        ));
        assert!(ParameterPair::new(60, 50).is_err());
        assert!(ParameterPair::new(0, 5).is_err());
    }

    #[test]
    fn test_pair_display() {
        let pair = ParameterPair::new(9, 21).unwrap();
        assert_eq!(pair.to_string(), "(9, 21)");
    }

    #[test]
    fn test_years_between_anniversaries() {
        assert_eq!(years_between(d(2020, 7, 1), d(2025, 7, 1)), 5.0);
        assert_eq!(years_between(d(2021, 7, 1), d(2025, 7, 1)), 4.0);
    }

    #[test]
    fn test_years_between_fractional() {
        let years = years_between(d(2024, 1, 1), d(2024, 7, 1));
        assert!((years - 182.0 / 365.25).abs() < 1e-12);
        assert!(years_between(d(2024, 7, 1), d(2024, 1, 1)) < 0.0);
    }

    #[test]
    fn test_years_between_leap_day() {
        let years = years_between(d(2020, 2, 29), d(2021, 3, 1));
        assert!(years > 1.0 && years < 1.01);
    }
}
