//! Price data loading and the date-indexed price series.

use crate::error::{BacktestError, Result};
use crate::types::Bar;
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Raw CSV row with flexible header names.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(
        alias = "Date",
        alias = "date",
        alias = "DATE",
        alias = "Timestamp",
        alias = "timestamp",
        alias = "Datetime",
        alias = "datetime"
    )]
    date: String,
    #[serde(alias = "Open", alias = "open", alias = "o")]
    open: f64,
    #[serde(alias = "High", alias = "high", alias = "h", default)]
    high: Option<f64>,
    #[serde(alias = "Low", alias = "low", alias = "l", default)]
    low: Option<f64>,
    #[serde(alias = "Close", alias = "close", alias = "c", default)]
    close: Option<f64>,
    #[serde(alias = "Volume", alias = "volume", alias = "v", alias = "vol", default)]
    volume: Option<f64>,
}

/// Data source configuration.
#[derive(Debug, Clone)]
pub struct DataConfig {
    /// Date format string (e.g. "%Y-%m-%d"). Common formats are tried when unset.
    pub date_format: Option<String>,
    /// Whether the CSV has headers.
    pub has_headers: bool,
    /// CSV delimiter character. If None, delimiter is auto-detected.
    pub delimiter: Option<u8>,
    /// Skip invalid rows instead of failing.
    pub skip_invalid: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            date_format: None,
            has_headers: true,
            delimiter: None,
            skip_invalid: true,
        }
    }
}

/// Detect the CSV delimiter from the first few lines of the file.
///
/// Picks the candidate that splits every sampled line into the same number
/// of fields, preferring more fields.
fn detect_delimiter(path: &Path) -> Result<u8> {
    let reader = BufReader::new(File::open(path)?);
    let lines: Vec<String> = reader.lines().take(5).filter_map(|l| l.ok()).collect();

    let mut best = (b',', 0usize);
    for delim in [b',', b'\t', b';', b'|'] {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| line.bytes().filter(|&b| b == delim).count() + 1)
            .collect();

        let Some(&first) = counts.first() else {
            continue;
        };
        if first >= 2 && counts.iter().all(|&c| c == first) && first > best.1 {
            best = (delim, first);
        }
    }

    debug!("Detected delimiter {:?} with {} fields", best.0 as char, best.1);
    Ok(best.0)
}

/// Parse a date string, trying an explicit format first and common ones after.
pub fn parse_date(s: &str, format: Option<&str>) -> Result<NaiveDate> {
    let s = s.trim();

    if let Some(fmt) = format {
        return NaiveDate::parse_from_str(s, fmt)
            .or_else(|_| NaiveDateTime::parse_from_str(s, fmt).map(|dt| dt.date()))
            .map_err(BacktestError::from);
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }

    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%d %H:%M:%S%:z",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    Err(BacktestError::DataError(format!(
        "Could not parse date: '{}'",
        s
    )))
}

/// Load daily bars from a CSV file.
///
/// Only the date and open columns are required; missing high/low/close
/// default to the open and missing volume to zero.
pub fn load_csv(path: impl AsRef<Path>, config: &DataConfig) -> Result<Vec<Bar>> {
    let path = path.as_ref();
    info!("Loading data from: {}", path.display());

    let delimiter = match config.delimiter {
        Some(d) => d,
        None => detect_delimiter(path)?,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(config.has_headers)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;

    let mut bars = Vec::new();
    let mut skipped = 0;

    for (row_num, result) in reader.deserialize::<CsvRow>().enumerate() {
        let parsed = result.map_err(BacktestError::from).and_then(|row| {
            let date = parse_date(&row.date, config.date_format.as_deref())?;
            let open = row.open;
            let bar = Bar::new(
                date,
                open,
                row.high.unwrap_or(open),
                row.low.unwrap_or(open),
                row.close.unwrap_or(open),
                row.volume.unwrap_or(0.0),
            );
            if bar.validate() {
                Ok(bar)
            } else {
                Err(BacktestError::DataError(format!(
                    "Non-positive open at row {}: {:?}",
                    row_num + 1,
                    bar
                )))
            }
        });

        match parsed {
            Ok(bar) => bars.push(bar),
            Err(e) if config.skip_invalid => {
                debug!("Skipping row {}: {}", row_num + 1, e);
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if skipped > 0 {
        warn!("Skipped {} invalid rows", skipped);
    }

    if bars.is_empty() {
        return Err(BacktestError::NoData);
    }

    bars.sort_by_key(|b| b.date);
    if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
        return Err(BacktestError::DataError(format!(
            "Duplicate rows for {} in {}",
            pair[0].date,
            path.display()
        )));
    }

    info!(
        "Loaded {} bars from {} to {}",
        bars.len(),
        bars[0].date,
        bars[bars.len() - 1].date
    );

    Ok(bars)
}

/// Daily bars for a single instrument, ordered by date.
///
/// Lookups go through binary search over the sorted dates: point lookups
/// require an exact match, range lookups use half-open bounds.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Build a series. Bars are sorted; duplicate dates and non-positive
    /// opens are rejected.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Result<Self> {
        if bars.is_empty() {
            return Err(BacktestError::NoData);
        }

        bars.sort_by_key(|b| b.date);

        if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(BacktestError::DataError(format!(
                "Duplicate bar for {}",
                pair[0].date
            )));
        }
        if let Some(bar) = bars.iter().find(|b| !b.validate()) {
            return Err(BacktestError::DataError(format!(
                "Open price must be positive, got {} on {}",
                bar.open, bar.date
            )));
        }

        Ok(Self {
            symbol: symbol.into(),
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }

    /// Opening prices in date order.
    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    /// Dates in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    /// Index of the bar on exactly `date`.
    pub fn index_of(&self, date: NaiveDate) -> Result<usize> {
        self.bars
            .binary_search_by_key(&date, |b| b.date)
            .map_err(|_| BacktestError::DateNotFound(date))
    }

    /// Open price on exactly `date`.
    pub fn open_at(&self, date: NaiveDate) -> Result<f64> {
        self.index_of(date).map(|i| self.bars[i].open)
    }

    /// Index range of bars with `start <= date < end`. May be empty.
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> Range<usize> {
        let lo = self.bars.partition_point(|b| b.date < start);
        let hi = self.bars.partition_point(|b| b.date < end).max(lo);
        lo..hi
    }

    /// Index range of bars with `start <= date <= end`. May be empty.
    pub fn range_inclusive(&self, start: NaiveDate, end: NaiveDate) -> Range<usize> {
        let lo = self.bars.partition_point(|b| b.date < start);
        let hi = self.bars.partition_point(|b| b.date <= end).max(lo);
        lo..hi
    }
}

/// Source of price history and dividend metadata for an instrument.
pub trait MarketDataProvider {
    /// Daily bars for `symbol` with `start <= date < end`.
    fn price_series(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries>;

    /// Best-effort annual dividend yield in percent. `None` when unknown.
    fn dividend_yield(&self, symbol: &str) -> Result<Option<f64>>;
}

/// Provider backed by a directory of `<SYMBOL>.csv` files.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
    config: DataConfig,
    dividend_yields: HashMap<String, f64>,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>, config: DataConfig) -> Self {
        Self {
            dir: dir.into(),
            config,
            dividend_yields: HashMap::new(),
        }
    }

    /// Register a known dividend yield (percent) for a symbol.
    pub fn with_dividend_yield(mut self, symbol: impl Into<String>, yield_pct: f64) -> Self {
        self.dividend_yields.insert(symbol.into(), yield_pct);
        self
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol))
    }
}

impl MarketDataProvider for CsvProvider {
    fn price_series(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries> {
        let bars: Vec<Bar> = load_csv(self.path_for(symbol), &self.config)?
            .into_iter()
            .filter(|b| b.date >= start && b.date < end)
            .collect();

        if bars.is_empty() {
            return Err(BacktestError::EmptyWindow { start, end });
        }
        PriceSeries::new(symbol, bars)
    }

    fn dividend_yield(&self, symbol: &str) -> Result<Option<f64>> {
        Ok(self.dividend_yields.get(symbol).copied())
    }
}

/// Instruments offered for selection: (company name, ticker).
pub const INSTRUMENTS: &[(&str, &str)] = &[
    ("Saudi Arabian Oil Company", "2222.SR"),
    ("Al Rajhi Banking and Investment Corporation", "1120.SR"),
    ("The Saudi National Bank", "1180.SR"),
    ("Saudi Telecom Company", "7010.SR"),
    ("Saudi Arabian Mining Company", "1211.SR"),
    ("Alinma Bank", "1150.SR"),
    ("Saudi Basic Industries Corporation", "2010.SR"),
    ("Dr. Sulaiman Al Habib Medical Services Group Company", "4013.SR"),
    ("Riyad Bank", "1010.SR"),
    ("Saudi Awwal Bank", "1060.SR"),
    ("Abdullah Al-Othaim Markets Company", "4001.SR"),
];

/// Look up a ticker by company name.
pub fn ticker_for(name: &str) -> Option<&'static str> {
    INSTRUMENTS
        .iter()
        .find(|(company, _)| company.eq_ignore_ascii_case(name))
        .map(|(_, ticker)| *ticker)
}
