//! Single-position, long-only moving-average crossover simulator.
//!
//! The simulator replays a window of opening prices against two aligned
//! moving averages. It is either fully in cash or fully invested:
//!
//! - before the first bar, it buys if the short average is already above the long one;
//! - on a golden cross (short moves from below to above long) it buys with all cash;
//! - on a death cross (short moves from above to below long) it sells all shares.
//!
//! A missing average on either side of a comparison never produces a signal.
//! There are no costs, no partial fills and no shorting.

use crate::error::{BacktestError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the simulated account holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Holding {
    /// Currency only.
    Cash(f64),
    /// Shares only.
    Invested(f64),
}

impl Holding {
    pub fn cash(&self) -> f64 {
        match self {
            Holding::Cash(c) => *c,
            Holding::Invested(_) => 0.0,
        }
    }

    pub fn shares(&self) -> f64 {
        match self {
            Holding::Cash(_) => 0.0,
            Holding::Invested(s) => *s,
        }
    }

    pub fn is_invested(&self) -> bool {
        matches!(self, Holding::Invested(_))
    }
}

/// Direction of an executed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// One executed buy or sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Position inside the simulated window.
    pub index: usize,
    /// Bar date, when the caller supplied dates.
    pub date: Option<NaiveDate>,
    pub side: Side,
    pub price: f64,
    /// Holding right after the trade.
    pub holding: Holding,
}

/// Final state of a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub final_cash: f64,
    pub final_shares: f64,
    /// Open price of the last bar in the window.
    pub last_price: f64,
    pub transitions: Vec<Transition>,
}

impl SimulationResult {
    /// `final_cash + final_shares * last_price`.
    pub fn terminal_value(&self) -> f64 {
        self.final_cash + self.final_shares * self.last_price
    }

    pub fn trade_count(&self) -> usize {
        self.transitions.len()
    }
}

/// Run the crossover state machine over aligned prices and averages.
pub fn simulate(
    prices: &[f64],
    short: &[Option<f64>],
    long: &[Option<f64>],
    starting_cash: f64,
) -> Result<SimulationResult> {
    run(prices, None, short, long, starting_cash)
}

/// Like [`simulate`], recording the bar date on each transition.
pub fn simulate_series(
    prices: &[f64],
    dates: &[NaiveDate],
    short: &[Option<f64>],
    long: &[Option<f64>],
    starting_cash: f64,
) -> Result<SimulationResult> {
    if dates.len() != prices.len() {
        return Err(BacktestError::DataError(format!(
            "{} dates supplied for {} prices",
            dates.len(),
            prices.len()
        )));
    }
    run(prices, Some(dates), short, long, starting_cash)
}

/// Cross direction between two consecutive points, if both are fully defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cross {
    Golden,
    Death,
}

fn detect_cross(
    prev: (Option<f64>, Option<f64>),
    curr: (Option<f64>, Option<f64>),
) -> Option<Cross> {
    let (Some(ps), Some(pl), Some(cs), Some(cl)) = (prev.0, prev.1, curr.0, curr.1) else {
        return None;
    };

    if cs > cl && ps < pl {
        Some(Cross::Golden)
    } else if cs < cl && ps > pl {
        Some(Cross::Death)
    } else {
        None
    }
}

fn run(
    prices: &[f64],
    dates: Option<&[NaiveDate]>,
    short: &[Option<f64>],
    long: &[Option<f64>],
    starting_cash: f64,
) -> Result<SimulationResult> {
    if prices.len() != short.len() || prices.len() != long.len() {
        return Err(BacktestError::MisalignedInputs {
            prices: prices.len(),
            short: short.len(),
            long: long.len(),
        });
    }
    let Some(&last_price) = prices.last() else {
        return Err(BacktestError::InvalidInput(
            "cannot simulate an empty window".to_string(),
        ));
    };
    if !(starting_cash.is_finite() && starting_cash > 0.0) {
        return Err(BacktestError::InvalidInput(format!(
            "starting cash must be positive, got {}",
            starting_cash
        )));
    }

    let mut holding = Holding::Cash(starting_cash);
    let mut transitions = Vec::new();

    let mut trade = |holding: &mut Holding, index: usize, side: Side| {
        let price = prices[index];
        *holding = match side {
            Side::Buy => Holding::Invested(holding.cash() / price),
            Side::Sell => Holding::Cash(holding.shares() * price),
        };
        transitions.push(Transition {
            index,
            date: dates.map(|d| d[index]),
            side,
            price,
            holding: *holding,
        });
    };

    if let (Some(s), Some(l)) = (short[0], long[0]) {
        if s > l {
            trade(&mut holding, 0, Side::Buy);
        }
    }

    for i in 1..prices.len() {
        match detect_cross((short[i - 1], long[i - 1]), (short[i], long[i])) {
            Some(Cross::Golden) if !holding.is_invested() => trade(&mut holding, i, Side::Buy),
            Some(Cross::Death) if holding.is_invested() => trade(&mut holding, i, Side::Sell),
            _ => {}
        }
    }

    Ok(SimulationResult {
        final_cash: holding.cash(),
        final_shares: holding.shares(),
        last_price,
        transitions,
    })
}
