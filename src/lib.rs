//! stockcross - walk-forward validation of moving-average crossover strategies.
//!
//! # Overview
//!
//! stockcross compares two ways of holding a single stock over daily price
//! history:
//!
//! - **Buy-and-hold**, with a flat dividend-yield adjustment
//! - **SMA crossover**: buy with all cash when the short moving average crosses
//!   above the long one, sell everything when it crosses back below
//!
//! A crossover backtest over the whole history flatters whichever window pair
//! fits best in hindsight. The [`walkforward`] module instead searches the pair
//! grid on each training window and measures the winner on the following
//! unseen test window. The compounded test yields estimate how the rule would
//! have done going forward.
//!
//! # Quick Start
//!
//! ```no_run
//! use stockcross::data::{CsvProvider, DataConfig, MarketDataProvider};
//! use stockcross::walkforward::{default_folds, default_grid, WalkForwardConfig, WalkForwardValidator};
//! use chrono::NaiveDate;
//!
//! let provider = CsvProvider::new("data", DataConfig::default());
//! let series = provider
//!     .price_series(
//!         "2222.SR",
//!         NaiveDate::from_ymd_opt(2019, 12, 1).unwrap(),
//!         NaiveDate::from_ymd_opt(2025, 7, 13).unwrap(),
//!     )
//!     .unwrap();
//!
//! let validator = WalkForwardValidator::new(WalkForwardConfig::default());
//! let report = validator.run(&series, &default_folds().unwrap(), &default_grid()).unwrap();
//! println!("{}", report.summary());
//! ```
//!
//! # Modules
//!
//! - [`types`]: Bars, parameter pairs, year arithmetic
//! - [`data`]: CSV loading, the date-indexed [`PriceSeries`], data providers
//! - [`moving_average`]: Rolling means aligned to series dates
//! - [`simulator`]: Single-position crossover state machine
//! - [`walkforward`]: Folds, grid search and out-of-sample aggregation
//! - [`buy_hold`]: Buy-and-hold baseline
//! - [`report`]: Dashboard figures and chart series
//! - [`config`]: TOML configuration and session selection

pub mod buy_hold;
pub mod config;
pub mod data;
pub mod error;
pub mod moving_average;
pub mod report;
pub mod simulator;
pub mod types;
pub mod walkforward;

pub use buy_hold::{buy_and_hold, BuyAndHoldResult};
pub use config::{AnalysisFileConfig, SessionConfig};
pub use data::{load_csv, CsvProvider, DataConfig, MarketDataProvider, PriceSeries};
pub use error::{BacktestError, Result};
pub use moving_average::{rolling_mean, MovingAverageSeries};
pub use report::{build_report, DashboardReport, ReportSettings};
pub use simulator::{simulate, Holding, SimulationResult};
pub use types::{Bar, ParameterPair};
pub use walkforward::{
    default_folds, default_grid, Fold, FoldOutcome, WalkForwardConfig, WalkForwardReport,
    WalkForwardValidator,
};
