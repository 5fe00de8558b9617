//! Error types for the crossover backtester.

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for the crossover backtester.
#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("No bar found for date {0}")]
    DateNotFound(NaiveDate),

    #[error(
        "Insufficient history in fold {fold}: {available} training bars, largest window needs {required}"
    )]
    InsufficientHistory {
        fold: usize,
        available: usize,
        required: usize,
    },

    #[error("Empty window: no bars in [{start}, {end})")]
    EmptyWindow { start: NaiveDate, end: NaiveDate },

    #[error("Invalid parameter pair ({short}, {long}): short window must be >= 1 and less than long window")]
    InvalidParameterPair { short: usize, long: usize },

    #[error("Invalid fold: {0}")]
    InvalidFold(String),

    #[error("Misaligned inputs: {prices} prices, {short} short MA values, {long} long MA values")]
    MisalignedInputs {
        prices: usize,
        short: usize,
        long: usize,
    },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParseError(#[from] chrono::ParseError),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("No data loaded")]
    NoData,

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for backtest operations.
pub type Result<T> = std::result::Result<T, BacktestError>;
