//! Assembles the figures a dashboard shows for one instrument.
//!
//! A report combines the buy-and-hold baseline, a backtest of the
//! user-selected window pair over the same horizon, the walk-forward
//! estimate, and the price/average series for charting.

use crate::buy_hold::{buy_and_hold, BuyAndHoldResult};
use crate::config::{AnalysisFileConfig, SessionConfig};
use crate::data::PriceSeries;
use crate::error::{BacktestError, Result};
use crate::moving_average::rolling_mean;
use crate::simulator::{simulate_series, SimulationResult};
use crate::types::{years_between, ParameterPair};
use crate::walkforward::{Fold, WalkForwardConfig, WalkForwardReport, WalkForwardValidator};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Everything besides the session needed to build a report.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub starting_cash: f64,
    pub dividend_yield_pct: Option<f64>,
    pub walkforward: WalkForwardConfig,
    pub folds: Vec<Fold>,
    pub grid: Vec<ParameterPair>,
}

impl ReportSettings {
    /// Settings from a configuration file. `dividend_yield_pct` overrides the
    /// file when the provider knows better.
    pub fn from_file(config: &AnalysisFileConfig, dividend_yield_pct: Option<f64>) -> Result<Self> {
        let (start, end) = config.buy_and_hold_range()?;
        Ok(Self {
            start,
            end,
            starting_cash: config.buy_and_hold.starting_cash,
            dividend_yield_pct: dividend_yield_pct.or(config.data.dividend_yield_pct),
            walkforward: config.walkforward.to_walkforward_config()?,
            folds: config.walkforward.to_folds()?,
            grid: config.walkforward.to_grid()?,
        })
    }
}

/// The selected pair simulated over the whole report horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedPairResult {
    pub pair: ParameterPair,
    pub terminal_value: f64,
    /// Terminal value over starting cash, minus one.
    pub cumulative_return: f64,
    pub annualized_return: f64,
    pub trades: usize,
}

/// One row of the chart data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub open: f64,
    pub short_ma: Option<f64>,
    pub long_ma: Option<f64>,
}

/// All figures for one instrument and session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardReport {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub selected: SelectedPairResult,
    pub buy_and_hold: BuyAndHoldResult,
    pub walk_forward: WalkForwardReport,
    pub chart: Vec<ChartPoint>,
}

impl DashboardReport {
    /// Plain-text summary of the three headline returns.
    pub fn summary(&self) -> String {
        format!(
            "{symbol} ({start} .. {end})\n\
             Selected SMA {pair} Annualized Return: {selected:.2}% ({trades} trades)\n\
             Buy-and-Hold Annualized Return: {bh:.2}% ({bh_price:.2}% before dividends)\n\
             Validated SMA Crossover Annualized Return: {wf:.2}%\n\n\
             {bh_detail}\n\n\
             {wf_detail}",
            symbol = self.symbol,
            start = self.start,
            end = self.end,
            pair = self.selected.pair,
            selected = self.selected.annualized_return * 100.0,
            trades = self.selected.trades,
            bh = self.buy_and_hold.cagr_with_dividends * 100.0,
            bh_price = self.buy_and_hold.cagr * 100.0,
            wf = self.walk_forward.annualized_yield * 100.0,
            bh_detail = self.buy_and_hold.summary(),
            wf_detail = self.walk_forward.summary(),
        )
    }

    /// Write the chart series as CSV.
    pub fn write_chart_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for point in &self.chart {
            writer.serialize(point)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Simulate `pair` over `[start, end]` using averages from the full series.
pub fn backtest_pair(
    series: &PriceSeries,
    pair: ParameterPair,
    start: NaiveDate,
    end: NaiveDate,
    starting_cash: f64,
) -> Result<SimulationResult> {
    let range = series.range_inclusive(start, end);
    if range.is_empty() {
        return Err(BacktestError::EmptyWindow { start, end });
    }

    let short = rolling_mean(series, pair.short)?;
    let long = rolling_mean(series, pair.long)?;
    let opens = series.opens();
    let dates = series.dates();

    simulate_series(
        &opens[range.clone()],
        &dates[range.clone()],
        short.slice(range.clone()),
        long.slice(range),
        starting_cash,
    )
}

/// Price and both averages over `[start, end]`.
pub fn chart_series(
    series: &PriceSeries,
    pair: ParameterPair,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<ChartPoint>> {
    let short = rolling_mean(series, pair.short)?;
    let long = rolling_mean(series, pair.long)?;
    let range = series.range_inclusive(start, end);

    Ok(series.bars()[range.clone()]
        .iter()
        .zip(short.slice(range.clone()))
        .zip(long.slice(range))
        .map(|((bar, &short_ma), &long_ma)| ChartPoint {
            date: bar.date,
            open: bar.open,
            short_ma,
            long_ma,
        })
        .collect())
}

/// Build the full report for one session.
pub fn build_report(
    series: &PriceSeries,
    session: &SessionConfig,
    settings: &ReportSettings,
) -> Result<DashboardReport> {
    info!(
        "Building report for {} with selected pair {}",
        session.symbol, session.pair
    );

    let buy_and_hold = buy_and_hold(
        series,
        settings.start,
        settings.end,
        settings.starting_cash,
        settings.dividend_yield_pct,
    )?;

    let result = backtest_pair(
        series,
        session.pair,
        settings.start,
        settings.end,
        settings.starting_cash,
    )?;
    let growth = result.terminal_value() / settings.starting_cash;
    let years = years_between(settings.start, settings.end);
    let selected = SelectedPairResult {
        pair: session.pair,
        terminal_value: result.terminal_value(),
        cumulative_return: growth - 1.0,
        annualized_return: growth.powf(1.0 / years) - 1.0,
        trades: result.trade_count(),
    };

    let walk_forward = WalkForwardValidator::new(settings.walkforward.clone()).run(
        series,
        &settings.folds,
        &settings.grid,
    )?;

    let chart = chart_series(series, session.pair, settings.start, settings.end)?;

    Ok(DashboardReport {
        symbol: session.symbol.clone(),
        start: settings.start,
        end: settings.end,
        selected,
        buy_and_hold,
        walk_forward,
        chart,
    })
}
