//! Configuration file support.
//!
//! An analysis is described by a TOML file so runs are reproducible. The
//! file converts into the typed settings the engine consumes.

use crate::data::DataConfig;
use crate::error::{BacktestError, Result};
use crate::types::ParameterPair;
use crate::walkforward::{Fold, WalkForwardConfig, DEFAULT_STARTING_CASH};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::info;

/// Allowed short-window lengths for an interactive selection.
pub const SHORT_WINDOW_RANGE: RangeInclusive<usize> = 5..=50;
/// Allowed long-window lengths for an interactive selection.
pub const LONG_WINDOW_RANGE: RangeInclusive<usize> = 51..=140;

/// The instrument and window pair chosen for one interactive run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub symbol: String,
    pub pair: ParameterPair,
}

impl SessionConfig {
    /// Create a session, checking the windows against the selectable ranges.
    pub fn new(symbol: impl Into<String>, short_window: usize, long_window: usize) -> Result<Self> {
        if !SHORT_WINDOW_RANGE.contains(&short_window) {
            return Err(BacktestError::ConfigError(format!(
                "short window {} outside {}..={}",
                short_window,
                SHORT_WINDOW_RANGE.start(),
                SHORT_WINDOW_RANGE.end()
            )));
        }
        if !LONG_WINDOW_RANGE.contains(&long_window) {
            return Err(BacktestError::ConfigError(format!(
                "long window {} outside {}..={}",
                long_window,
                LONG_WINDOW_RANGE.start(),
                LONG_WINDOW_RANGE.end()
            )));
        }

        Ok(Self {
            symbol: symbol.into(),
            pair: ParameterPair::new(short_window, long_window)?,
        })
    }
}

/// Complete analysis configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisFileConfig {
    /// Data source settings.
    #[serde(default)]
    pub data: DataSettings,
    /// User-selected moving-average windows.
    #[serde(default)]
    pub strategy: StrategySettings,
    /// Buy-and-hold horizon.
    #[serde(default)]
    pub buy_and_hold: BuyAndHoldSettings,
    /// Walk-forward folds and parameter grid.
    #[serde(default)]
    pub walkforward: WalkForwardSettings,
}

/// Data source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    /// Directory holding `<symbol>.csv` files.
    #[serde(default = "default_dir")]
    pub dir: String,
    /// Ticker to analyze.
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Annual dividend yield in percent, if known.
    #[serde(default)]
    pub dividend_yield_pct: Option<f64>,
    /// Date format in the CSV files.
    #[serde(default)]
    pub date_format: Option<String>,
    /// First date of history to load (YYYY-MM-DD).
    #[serde(default = "default_history_start")]
    pub history_start: String,
    /// Load history strictly before this date (YYYY-MM-DD).
    #[serde(default = "default_history_end")]
    pub history_end: String,
}

fn default_dir() -> String { "data".to_string() }
fn default_symbol() -> String { "2222.SR".to_string() }
fn default_history_start() -> String { "2019-12-01".to_string() }
fn default_history_end() -> String { "2025-07-13".to_string() }

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            symbol: default_symbol(),
            dividend_yield_pct: None,
            date_format: None,
            history_start: default_history_start(),
            history_end: default_history_end(),
        }
    }
}

/// Moving-average windows for the selected-pair backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySettings {
    #[serde(default = "default_short_window")]
    pub short_window: usize,
    #[serde(default = "default_long_window")]
    pub long_window: usize,
}

fn default_short_window() -> usize { 30 }
fn default_long_window() -> usize { 80 }

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            short_window: default_short_window(),
            long_window: default_long_window(),
        }
    }
}

/// Buy-and-hold horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyAndHoldSettings {
    /// Purchase date (YYYY-MM-DD); must be a trading day.
    #[serde(default = "default_start")]
    pub start: String,
    /// Valuation date (YYYY-MM-DD); must be a trading day.
    #[serde(default = "default_end")]
    pub end: String,
    #[serde(default = "default_cash")]
    pub starting_cash: f64,
}

fn default_start() -> String { "2020-07-01".to_string() }
fn default_end() -> String { "2025-07-01".to_string() }
fn default_cash() -> f64 { DEFAULT_STARTING_CASH }

impl Default for BuyAndHoldSettings {
    fn default() -> Self {
        Self {
            start: default_start(),
            end: default_end(),
            starting_cash: default_cash(),
        }
    }
}

/// Explicit fold boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldSettings {
    pub train_start: String,
    pub train_end: String,
    pub test_end: String,
}

/// Walk-forward settings.
///
/// When `folds` is absent, rolling folds are generated from `start`, `end`,
/// `train_months` and `test_months`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardSettings {
    #[serde(default = "default_cash")]
    pub starting_cash: f64,
    /// Years used to annualize; derived from the folds when unset.
    #[serde(default)]
    pub test_years: Option<f64>,
    #[serde(default = "default_true")]
    pub parallel: bool,
    /// Candidate `[short, long]` pairs.
    #[serde(default)]
    pub grid: Option<Vec<[usize; 2]>>,
    #[serde(default)]
    pub folds: Option<Vec<FoldSettings>>,
    #[serde(default = "default_start")]
    pub start: String,
    #[serde(default = "default_end")]
    pub end: String,
    #[serde(default = "default_train_months")]
    pub train_months: u32,
    #[serde(default = "default_test_months")]
    pub test_months: u32,
}

fn default_true() -> bool { true }
fn default_train_months() -> u32 { 12 }
fn default_test_months() -> u32 { 6 }

impl Default for WalkForwardSettings {
    fn default() -> Self {
        Self {
            starting_cash: default_cash(),
            test_years: None,
            parallel: true,
            grid: None,
            folds: None,
            start: default_start(),
            end: default_end(),
            train_months: default_train_months(),
            test_months: default_test_months(),
        }
    }
}

fn parse_config_date(s: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
}

impl WalkForwardSettings {
    /// Engine configuration for the validator.
    pub fn to_walkforward_config(&self) -> Result<WalkForwardConfig> {
        if !(self.starting_cash.is_finite() && self.starting_cash > 0.0) {
            return Err(BacktestError::ConfigError(format!(
                "walkforward.starting_cash must be positive, got {}",
                self.starting_cash
            )));
        }
        if let Some(years) = self.test_years {
            if !(years.is_finite() && years > 0.0) {
                return Err(BacktestError::ConfigError(format!(
                    "walkforward.test_years must be positive, got {}",
                    years
                )));
            }
        }

        Ok(WalkForwardConfig {
            starting_cash: self.starting_cash,
            test_years: self.test_years,
            parallel: self.parallel,
        })
    }

    /// The fold list, explicit or generated.
    pub fn to_folds(&self) -> Result<Vec<Fold>> {
        match &self.folds {
            Some(folds) => folds
                .iter()
                .map(|f| {
                    Fold::new(
                        parse_config_date(&f.train_start)?,
                        parse_config_date(&f.train_end)?,
                        parse_config_date(&f.test_end)?,
                    )
                })
                .collect(),
            None => Fold::rolling(
                parse_config_date(&self.start)?,
                parse_config_date(&self.end)?,
                self.train_months,
                self.test_months,
            ),
        }
    }

    /// The parameter grid, explicit or the default one.
    pub fn to_grid(&self) -> Result<Vec<ParameterPair>> {
        match &self.grid {
            Some(grid) => grid
                .iter()
                .map(|[short, long]| ParameterPair::new(*short, *long))
                .collect(),
            None => Ok(crate::walkforward::default_grid()),
        }
    }
}

impl AnalysisFileConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path)?;
        let config: AnalysisFileConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| BacktestError::ConfigError(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// The interactive selection described by this file.
    pub fn to_session(&self) -> Result<SessionConfig> {
        SessionConfig::new(
            self.data.symbol.clone(),
            self.strategy.short_window,
            self.strategy.long_window,
        )
    }

    /// CSV loader settings.
    pub fn to_data_config(&self) -> DataConfig {
        DataConfig {
            date_format: self.data.date_format.clone(),
            ..Default::default()
        }
    }

    /// Directory holding the price files.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.dir)
    }

    /// History range to request from the provider, `[start, end)`.
    pub fn history_range(&self) -> Result<(NaiveDate, NaiveDate)> {
        let start = parse_config_date(&self.data.history_start)?;
        let end = parse_config_date(&self.data.history_end)?;
        if start >= end {
            return Err(BacktestError::ConfigError(format!(
                "data.history_start {} must precede data.history_end {}",
                start, end
            )));
        }
        Ok((start, end))
    }

    /// Buy-and-hold horizon as dates.
    pub fn buy_and_hold_range(&self) -> Result<(NaiveDate, NaiveDate)> {
        Ok((
            parse_config_date(&self.buy_and_hold.start)?,
            parse_config_date(&self.buy_and_hold.end)?,
        ))
    }

    /// Generate an example configuration file content.
    pub fn example() -> String {
        r#"# stockcross analysis configuration

[data]
dir = "data"
symbol = "2222.SR"
# dividend_yield_pct = 6.5
# date_format = "%Y-%m-%d"
history_start = "2019-12-01"
history_end = "2025-07-13"

[strategy]
short_window = 30   # 5..=50
long_window = 80    # 51..=140

[buy_and_hold]
start = "2020-07-01"
end = "2025-07-01"
starting_cash = 100.0

[walkforward]
starting_cash = 100.0
# test_years = 4.0
grid = [[10, 50], [20, 100], [50, 200], [21, 55], [9, 21]]
start = "2020-07-01"
end = "2025-07-01"
train_months = 12
test_months = 6

# Explicit folds replace the generated ones:
# [[walkforward.folds]]
# train_start = "2020-07-01"
# train_end = "2021-07-01"
# test_end = "2022-01-01"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walkforward::default_folds;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AnalysisFileConfig::default();
        assert_eq!(config.data.symbol, "2222.SR");
        assert_eq!(config.strategy.short_window, 30);
        assert_eq!(config.walkforward.to_folds().unwrap(), default_folds().unwrap());
        assert_eq!(config.walkforward.to_grid().unwrap().len(), 5);
    }

    #[test]
    fn test_load_config() {
        let toml_content = r#"
[data]
dir = "prices"
symbol = "1120.SR"
dividend_yield_pct = 3.2

[strategy]
short_window = 10
long_window = 60

[walkforward]
test_years = 1.0
grid = [[2, 3], [3, 5]]

[[walkforward.folds]]
train_start = "2024-01-01"
train_end = "2024-02-01"
test_end = "2024-03-01"
"#;
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", toml_content).unwrap();

        let config = AnalysisFileConfig::load(file.path()).unwrap();
        assert_eq!(config.data.symbol, "1120.SR");
        assert_eq!(config.data.dividend_yield_pct, Some(3.2));
        assert_eq!(config.data_dir(), PathBuf::from("prices"));
        assert_eq!(config.buy_and_hold.starting_cash, 100.0);

        let session = config.to_session().unwrap();
        assert_eq!(session.pair, ParameterPair::new(10, 60).unwrap());

        let folds = config.walkforward.to_folds().unwrap();
        assert_eq!(folds.len(), 1);
        assert_eq!(
            config.walkforward.to_grid().unwrap(),
            vec![ParameterPair::new(2, 3).unwrap(), ParameterPair::new(3, 5).unwrap()]
        );
        assert_eq!(
            config.walkforward.to_walkforward_config().unwrap().test_years,
            Some(1.0)
        );
    }

    #[test]
    fn test_invalid_grid_pair() {
        let settings = WalkForwardSettings {
            grid: Some(vec![[50, 20]]),
            ..Default::default()
        };
        assert!(matches!(
            settings.to_grid(),
            Err(BacktestError::InvalidParameterPair { short: 50, long: 20 })
        ));
    }

    #[test]
    fn test_invalid_dates() {
        let mut config = AnalysisFileConfig::default();
        config.buy_and_hold.start = "July 1st".to_string();
        assert!(matches!(
            config.buy_and_hold_range(),
            Err(BacktestError::DateParseError(_))
        ));

        config.data.history_end = "2019-01-01".to_string();
        assert!(config.history_range().is_err());
    }

    #[test]
    fn test_session_bounds() {
        assert!(SessionConfig::new("2222.SR", 30, 80).is_ok());
        assert!(SessionConfig::new("2222.SR", 4, 80).is_err());
        assert!(SessionConfig::new("2222.SR", 30, 141).is_err());
    }

    #[test]
    fn test_save_config() {
        let config = AnalysisFileConfig::default();
        let file = NamedTempFile::new().unwrap();
        config.save(file.path()).unwrap();

        let loaded = AnalysisFileConfig::load(file.path()).unwrap();
        assert_eq!(loaded.data.symbol, config.data.symbol);
        assert_eq!(loaded.walkforward.train_months, 12);
    }

    #[test]
    fn test_example_config_parses() {
        let config: AnalysisFileConfig = toml::from_str(&AnalysisFileConfig::example()).unwrap();
        assert_eq!(config.walkforward.to_grid().unwrap().len(), 5);
        assert_eq!(config.walkforward.to_folds().unwrap().len(), 8);
    }
}
