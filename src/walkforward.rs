//! Walk-forward validation of moving-average crossover parameters.
//!
//! History is split into folds, each a training window followed by a test
//! window. On every fold the parameter grid is searched on the training
//! window, the winner is re-run on the unseen test window, and the test
//! yields are compounded into an out-of-sample return estimate.
//!
//! Moving averages are computed once over the full series and then sliced to
//! each window, so the first bars of a window average over history that
//! precedes it. Trailing windows only look backward, but a training window's
//! averages still depend on bars outside the window.

use crate::data::PriceSeries;
use crate::error::{BacktestError, Result};
use crate::moving_average::{rolling_mean_cached, MovingAverageSeries};
use crate::simulator::{simulate_series, SimulationResult};
use crate::types::{years_between, ParameterPair};
use chrono::{Months, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::{debug, info, warn};

/// Starting cash for every simulated window.
pub const DEFAULT_STARTING_CASH: f64 = 100.0;

/// The parameter pairs searched on each training window.
pub fn default_grid() -> Vec<ParameterPair> {
    [(10, 50), (20, 100), (50, 200), (21, 55), (9, 21)]
        .into_iter()
        .map(|(short, long)| ParameterPair { short, long })
        .collect()
}

/// One train/test split: train on `[train_start, train_end)`, test on
/// `[train_end, test_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub test_end: NaiveDate,
}

impl Fold {
    /// Create a fold; the three dates must be strictly increasing.
    pub fn new(train_start: NaiveDate, train_end: NaiveDate, test_end: NaiveDate) -> Result<Self> {
        if !(train_start < train_end && train_end < test_end) {
            return Err(BacktestError::InvalidFold(format!(
                "expected train_start < train_end < test_end, got {} / {} / {}",
                train_start, train_end, test_end
            )));
        }
        Ok(Self {
            train_start,
            train_end,
            test_end,
        })
    }

    /// Rolling folds whose test windows tile `[start + train_months, end)`.
    ///
    /// Each training window covers the `train_months` before its test
    /// window. Folds whose test window would run past `end` are dropped.
    pub fn rolling(
        start: NaiveDate,
        end: NaiveDate,
        train_months: u32,
        test_months: u32,
    ) -> Result<Vec<Fold>> {
        if train_months == 0 || test_months == 0 {
            return Err(BacktestError::InvalidFold(
                "train and test lengths must be at least one month".to_string(),
            ));
        }

        let add = |date: NaiveDate, months: u32| {
            date.checked_add_months(Months::new(months)).ok_or_else(|| {
                BacktestError::InvalidFold(format!("date overflow adding {} months to {}", months, date))
            })
        };

        let mut folds = Vec::new();
        let mut train_start = start;
        loop {
            let train_end = add(train_start, train_months)?;
            let test_end = add(train_end, test_months)?;
            if test_end > end {
                break;
            }
            folds.push(Fold::new(train_start, train_end, test_end)?);
            train_start = add(train_start, test_months)?;
        }

        if folds.is_empty() {
            return Err(BacktestError::InvalidFold(format!(
                "no complete fold fits between {} and {}",
                start, end
            )));
        }
        Ok(folds)
    }
}

/// Twelve-month train, six-month test folds from 2020-07-01 to 2025-07-01.
pub fn default_folds() -> Result<Vec<Fold>> {
    let date = |y, m, d| {
        NaiveDate::from_ymd_opt(y, m, d)
            .ok_or_else(|| BacktestError::InvalidFold(format!("invalid date {}-{}-{}", y, m, d)))
    };
    Fold::rolling(date(2020, 7, 1)?, date(2025, 7, 1)?, 12, 6)
}

/// Check that folds are chronological with non-overlapping test windows.
pub fn check_fold_order(folds: &[Fold]) -> Result<()> {
    for (i, pair) in folds.windows(2).enumerate() {
        if pair[1].train_end < pair[0].test_end {
            return Err(BacktestError::InvalidFold(format!(
                "fold {} test window starts {} before fold {} test window ends {}",
                i + 1,
                pair[1].train_end,
                i,
                pair[0].test_end
            )));
        }
    }
    Ok(())
}

/// Configuration for walk-forward validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    /// Cash each simulated window starts with.
    pub starting_cash: f64,
    /// Years spanned by all test windows, used to annualize the compounded
    /// yield. Derived from the fold dates when unset.
    pub test_years: Option<f64>,
    /// Evaluate grid candidates in parallel.
    pub parallel: bool,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            starting_cash: DEFAULT_STARTING_CASH,
            test_years: None,
            parallel: true,
        }
    }
}

impl WalkForwardConfig {
    /// Annualize over an explicit number of test years.
    pub fn with_test_years(mut self, years: f64) -> Self {
        self.test_years = Some(years);
        self
    }
}

/// Training-window score of one grid candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub pair: ParameterPair,
    pub terminal_value: f64,
}

/// Result of one fold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldOutcome {
    /// Position in the input fold list.
    pub index: usize,
    pub fold: Fold,
    /// Pair with the highest training terminal value.
    pub best_pair: ParameterPair,
    pub train_terminal_value: f64,
    /// Training terminal value divided by the starting cash.
    pub train_yield: f64,
    pub test_terminal_value: f64,
    /// Test terminal value divided by the starting cash.
    pub test_yield: f64,
    pub train_bars: usize,
    pub test_bars: usize,
    /// Trades the selected pair made on the test window.
    pub test_trades: usize,
    /// Every candidate's training score, in grid order.
    pub candidates: Vec<CandidateScore>,
}

/// Aggregated walk-forward results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardReport {
    pub outcomes: Vec<FoldOutcome>,
    /// Product of test yields minus one.
    pub cumulative_yield: f64,
    /// Compounded test yield per year minus one.
    pub annualized_yield: f64,
    /// Years used for annualization.
    pub test_years: f64,
}

impl WalkForwardReport {
    /// Aggregate fold outcomes over `test_years`.
    pub fn from_outcomes(outcomes: Vec<FoldOutcome>, test_years: f64) -> Result<Self> {
        if !(test_years.is_finite() && test_years > 0.0) {
            return Err(BacktestError::InvalidInput(format!(
                "test years must be positive, got {}",
                test_years
            )));
        }

        let growth: f64 = outcomes.iter().map(|o| o.test_yield).product();

        Ok(Self {
            outcomes,
            cumulative_yield: growth - 1.0,
            annualized_yield: growth.powf(1.0 / test_years) - 1.0,
            test_years,
        })
    }

    /// Plain-text summary of every fold and the aggregate.
    pub fn summary(&self) -> String {
        let mut out = String::from("Walk-Forward Validation:\n");
        for o in &self.outcomes {
            out.push_str(&format!(
                "  Fold #{} [{} .. {} | .. {}]: best {} train {:.2}% -> test {:.2}%\n",
                o.index,
                o.fold.train_start,
                o.fold.train_end,
                o.fold.test_end,
                o.best_pair,
                (o.train_yield - 1.0) * 100.0,
                (o.test_yield - 1.0) * 100.0
            ));
        }
        out.push_str(&format!(
            "  Cumulative Yield: {:.2}%\n  Annualized Yield: {:.2}% over {:.2} years",
            self.cumulative_yield * 100.0,
            self.annualized_yield * 100.0,
            self.test_years
        ));
        out
    }
}

/// Pick the candidate with the highest terminal value; ties keep the
/// earliest candidate.
pub fn select_best(candidates: &[CandidateScore]) -> Option<&CandidateScore> {
    candidates.iter().fold(None, |best, c| match best {
        Some(b) if b.terminal_value >= c.terminal_value || c.terminal_value.is_nan() => Some(b),
        _ => Some(c),
    })
}

/// Runs the fold loop.
pub struct WalkForwardValidator {
    config: WalkForwardConfig,
}

impl WalkForwardValidator {
    pub fn new(config: WalkForwardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WalkForwardConfig {
        &self.config
    }

    /// Validate `grid` over `folds`, returning one outcome per fold in order.
    pub fn validate(
        &self,
        series: &PriceSeries,
        folds: &[Fold],
        grid: &[ParameterPair],
    ) -> Result<Vec<FoldOutcome>> {
        if folds.is_empty() {
            return Err(BacktestError::InvalidInput("no folds given".to_string()));
        }
        if grid.is_empty() {
            return Err(BacktestError::InvalidInput(
                "parameter grid is empty".to_string(),
            ));
        }
        for pair in grid {
            ParameterPair::new(pair.short, pair.long)?;
        }
        check_fold_order(folds)?;

        info!(
            "Running walk-forward validation on {} with {} folds and {} candidates",
            series.symbol(),
            folds.len(),
            grid.len()
        );

        let required = grid.iter().map(|p| p.long).max().unwrap_or(0);
        let averages = rolling_mean_cached(series, grid.iter().flat_map(|p| [p.short, p.long]))?;
        let window = SeriesWindow {
            opens: series.opens(),
            dates: series.dates(),
            averages,
            starting_cash: self.config.starting_cash,
        };

        let mut outcomes = Vec::with_capacity(folds.len());

        for (index, fold) in folds.iter().enumerate() {
            let train = series.range(fold.train_start, fold.train_end);
            if train.is_empty() {
                return Err(BacktestError::EmptyWindow {
                    start: fold.train_start,
                    end: fold.train_end,
                });
            }
            let test = series.range(fold.train_end, fold.test_end);
            if test.is_empty() {
                return Err(BacktestError::EmptyWindow {
                    start: fold.train_end,
                    end: fold.test_end,
                });
            }
            if train.len() < required {
                return Err(BacktestError::InsufficientHistory {
                    fold: index,
                    available: train.len(),
                    required,
                });
            }
            if fold.test_end > series.last_date() + chrono::Duration::days(1) {
                warn!(
                    "Fold {} test window ends {} but data stops at {}",
                    index,
                    fold.test_end,
                    series.last_date()
                );
            }

            info!(
                "Processing fold {}: train {} bars, test {} bars",
                index,
                train.len(),
                test.len()
            );

            let candidates: Vec<CandidateScore> = if self.config.parallel {
                grid.par_iter()
                    .map(|pair| window.score(*pair, train.clone()))
                    .collect::<Result<Vec<_>>>()?
            } else {
                grid.iter()
                    .map(|pair| window.score(*pair, train.clone()))
                    .collect::<Result<Vec<_>>>()?
            };

            for c in &candidates {
                debug!(
                    "Fold {} candidate {} train terminal value {:.4}",
                    index, c.pair, c.terminal_value
                );
            }

            let best = select_best(&candidates)
                .copied()
                .ok_or_else(|| BacktestError::InvalidInput("parameter grid is empty".to_string()))?;

            let test_result = window.simulate(best.pair, test.clone())?;
            let test_terminal_value = test_result.terminal_value();
            let test_yield = test_terminal_value / self.config.starting_cash;

            info!(
                "Fold {}: best pair {} (train {:.2}), test yield {:.4}",
                index, best.pair, best.terminal_value, test_yield
            );

            outcomes.push(FoldOutcome {
                index,
                fold: *fold,
                best_pair: best.pair,
                train_terminal_value: best.terminal_value,
                train_yield: best.terminal_value / self.config.starting_cash,
                test_terminal_value,
                test_yield,
                train_bars: train.len(),
                test_bars: test.len(),
                test_trades: test_result.trade_count(),
                candidates,
            });
        }

        Ok(outcomes)
    }

    /// Validate and aggregate into a [`WalkForwardReport`].
    pub fn run(
        &self,
        series: &PriceSeries,
        folds: &[Fold],
        grid: &[ParameterPair],
    ) -> Result<WalkForwardReport> {
        let outcomes = self.validate(series, folds, grid)?;
        let test_years = match self.config.test_years {
            Some(years) => years,
            None => test_span_years(folds)?,
        };
        WalkForwardReport::from_outcomes(outcomes, test_years)
    }
}

/// Years from the first test window's start to the last one's end.
pub fn test_span_years(folds: &[Fold]) -> Result<f64> {
    match (folds.first(), folds.last()) {
        (Some(first), Some(last)) => Ok(years_between(first.train_end, last.test_end)),
        _ => Err(BacktestError::InvalidInput("no folds given".to_string())),
    }
}

/// Full-series inputs shared by every fold.
struct SeriesWindow {
    opens: Vec<f64>,
    dates: Vec<NaiveDate>,
    averages: BTreeMap<usize, MovingAverageSeries>,
    starting_cash: f64,
}

impl SeriesWindow {
    fn average(&self, window: usize) -> Result<&MovingAverageSeries> {
        self.averages.get(&window).ok_or_else(|| {
            BacktestError::InvalidInput(format!("no moving average computed for window {}", window))
        })
    }

    fn simulate(&self, pair: ParameterPair, range: Range<usize>) -> Result<SimulationResult> {
        let short = self.average(pair.short)?.slice(range.clone());
        let long = self.average(pair.long)?.slice(range.clone());
        simulate_series(
            &self.opens[range.clone()],
            &self.dates[range],
            short,
            long,
            self.starting_cash,
        )
    }

    fn score(&self, pair: ParameterPair, range: Range<usize>) -> Result<CandidateScore> {
        let result = self.simulate(pair, range)?;
        Ok(CandidateScore {
            pair,
            terminal_value: result.terminal_value(),
        })
    }
}
