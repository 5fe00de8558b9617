//! Buy-and-hold baseline.
//!
//! Dividends enter as a flat annual multiplier on the price-only growth rate,
//! `(1 + cagr) * (1 + yield / 100) - 1`. This approximates reinvestment and
//! ignores the actual ex-dividend dates.

use crate::data::PriceSeries;
use crate::error::{BacktestError, Result};
use crate::types::years_between;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Buy-and-hold outcome over a fixed horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyAndHoldResult {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub starting_cash: f64,
    pub shares_owned: f64,
    pub final_value: f64,
    pub years: f64,
    /// Annual dividend yield in percent; zero when the provider had none.
    pub dividend_yield_pct: f64,
    /// Price-only compound annual growth rate.
    pub cagr: f64,
    /// Growth rate including the flat dividend multiplier.
    pub cagr_with_dividends: f64,
}

impl BuyAndHoldResult {
    pub fn summary(&self) -> String {
        format!(
            "Buy-and-Hold:\n\
             On {}, {:.2} buys {:.2} shares.\n\
             On {}, these shares are worth {:.2}: CAGR {:.2}% over {:.2} years.\n\
             With a dividend yield of {:.2}%, the annual return is {:.2}%.",
            self.start,
            self.starting_cash,
            self.shares_owned,
            self.end,
            self.final_value,
            self.cagr * 100.0,
            self.years,
            self.dividend_yield_pct,
            self.cagr_with_dividends * 100.0
        )
    }
}

/// Buy at the open on `start` and hold until the open on `end`.
///
/// Both dates need a bar of their own. A missing date fails with
/// `DateNotFound` instead of falling back to a nearby bar.
pub fn buy_and_hold(
    series: &PriceSeries,
    start: NaiveDate,
    end: NaiveDate,
    starting_cash: f64,
    dividend_yield_pct: Option<f64>,
) -> Result<BuyAndHoldResult> {
    if start >= end {
        return Err(BacktestError::InvalidInput(format!(
            "buy-and-hold start {} must precede end {}",
            start, end
        )));
    }
    if !(starting_cash.is_finite() && starting_cash > 0.0) {
        return Err(BacktestError::InvalidInput(format!(
            "starting cash must be positive, got {}",
            starting_cash
        )));
    }

    let shares_owned = starting_cash / series.open_at(start)?;
    let final_value = shares_owned * series.open_at(end)?;
    let years = years_between(start, end);
    let dividend_yield_pct = dividend_yield_pct.unwrap_or(0.0);

    let growth = (final_value / starting_cash).powf(1.0 / years);
    let cagr = growth - 1.0;
    let cagr_with_dividends = growth * (1.0 + dividend_yield_pct / 100.0) - 1.0;

    info!(
        "Buy-and-hold {} from {} to {}: CAGR {:.2}%, with dividends {:.2}%",
        series.symbol(),
        start,
        end,
        cagr * 100.0,
        cagr_with_dividends * 100.0
    );

    Ok(BuyAndHoldResult {
        start,
        end,
        starting_cash,
        shares_owned,
        final_value,
        years,
        dividend_yield_pct,
        cagr,
        cagr_with_dividends,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bar;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn two_point_series(start_price: f64, end_price: f64) -> PriceSeries {
        PriceSeries::new(
            "TEST",
            vec![
                Bar::from_open(d(2020, 7, 1), start_price),
                Bar::from_open(d(2022, 3, 15), (start_price + end_price) / 2.0),
                Bar::from_open(d(2025, 7, 1), end_price),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_doubling_over_five_years() {
        let series = two_point_series(10.0, 20.0);
        let result = buy_and_hold(&series, d(2020, 7, 1), d(2025, 7, 1), 100.0, None).unwrap();

        assert_eq!(result.shares_owned, 10.0);
        assert_eq!(result.final_value, 200.0);
        assert_eq!(result.years, 5.0);
        assert!((result.cagr - (2f64.powf(0.2) - 1.0)).abs() < 1e-12);
        assert!((result.cagr - 0.1487).abs() < 1e-4);
        assert_eq!(result.cagr, result.cagr_with_dividends);
    }

    #[test]
    fn test_dividend_multiplier() {
        let series = two_point_series(10.0, 20.0);
        let result =
            buy_and_hold(&series, d(2020, 7, 1), d(2025, 7, 1), 100.0, Some(5.0)).unwrap();

        let expected = 2f64.powf(0.2) * 1.05 - 1.0;
        assert!((result.cagr_with_dividends - expected).abs() < 1e-12);
        assert_eq!(result.dividend_yield_pct, 5.0);
    }

    #[test]
    fn test_missing_date() {
        let series = two_point_series(10.0, 20.0);
        let err = buy_and_hold(&series, d(2020, 7, 2), d(2025, 7, 1), 100.0, None).unwrap_err();
        assert!(matches!(err, BacktestError::DateNotFound(date) if date == d(2020, 7, 2)));

        assert!(matches!(
            buy_and_hold(&series, d(2020, 7, 1), d(2025, 7, 2), 100.0, None),
            Err(BacktestError::DateNotFound(_))
        ));
    }

    #[test]
    fn test_rejects_inverted_horizon() {
        let series = two_point_series(10.0, 20.0);
        assert!(buy_and_hold(&series, d(2025, 7, 1), d(2020, 7, 1), 100.0, None).is_err());
        assert!(buy_and_hold(&series, d(2020, 7, 1), d(2025, 7, 1), -1.0, None).is_err());
    }

    #[test]
    fn test_summary() {
        let series = two_point_series(10.0, 20.0);
        let result = buy_and_hold(&series, d(2020, 7, 1), d(2025, 7, 1), 100.0, None).unwrap();
        assert!(result.summary().contains("14.87%"));
    }
}
