//! Example: walk-forward validation on synthetic data
//!
//! Searches the default window grid on each 12-month training window and
//! scores the winner on the following 6-month test window, then compares the
//! compounded out-of-sample yield with buy-and-hold.
//!
//! Run with: cargo run --example walkforward

use chrono::{Datelike, NaiveDate, Weekday};
use stockcross::buy_hold::buy_and_hold;
use stockcross::data::PriceSeries;
use stockcross::types::Bar;
use stockcross::walkforward::{
    default_folds, default_grid, WalkForwardConfig, WalkForwardValidator,
};

/// Weekday bars with alternating trend regimes.
fn generate_synthetic_series() -> stockcross::Result<PriceSeries> {
    let start = NaiveDate::from_ymd_opt(2019, 12, 1).unwrap_or_default();
    let end = NaiveDate::from_ymd_opt(2025, 7, 13).unwrap_or_default();

    let mut bars = Vec::new();
    let mut price = 30.0;
    let mut date = start;
    let mut i = 0usize;
    while date <= end {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            let trend = match (i / 250) % 4 {
                0 => 0.0008,
                1 => -0.0004,
                2 => 0.0006,
                _ => -0.0002,
            };
            let noise = ((i as f64 * 0.7).sin() * 0.4 + (i as f64 * 1.3).cos()) * 0.1;
            price = (price * (1.0 + trend) + noise).max(5.0);
            bars.push(Bar::from_open(date, price));
            i += 1;
        }
        date += chrono::Duration::days(1);
    }

    PriceSeries::new("SYNTH", bars)
}

fn main() -> stockcross::Result<()> {
    let series = generate_synthetic_series()?;
    println!(
        "Generated {} bars from {} to {}\n",
        series.len(),
        series.first_date(),
        series.last_date()
    );

    let validator = WalkForwardValidator::new(WalkForwardConfig::default());
    let report = validator.run(&series, &default_folds()?, &default_grid())?;
    println!("{}", report.summary());

    // Fold boundaries fall on calendar dates; the baseline needs trading days.
    let from = NaiveDate::from_ymd_opt(2020, 7, 1).unwrap_or_default();
    let to = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap_or_default();
    let start = series.bars().iter().find(|b| b.date >= from);
    let end = series.bars().iter().rev().find(|b| b.date <= to);
    if let (Some(start), Some(end)) = (start, end) {
        let baseline = buy_and_hold(&series, start.date, end.date, 100.0, None)?;
        println!("\n{}", baseline.summary());
    }

    Ok(())
}
