//! Command-line interface for the crossover backtester.

use stockcross::config::{AnalysisFileConfig, SessionConfig};
use stockcross::data::{ticker_for, CsvProvider, MarketDataProvider, PriceSeries, INSTRUMENTS};
use stockcross::error::Result;
use stockcross::report::{build_report, ReportSettings};
use stockcross::walkforward::WalkForwardValidator;
use stockcross::{buy_and_hold, BacktestError};

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// stockcross - SMA crossover vs. buy-and-hold with walk-forward validation.
#[derive(Parser)]
#[command(name = "stockcross")]
#[command(version)]
#[command(about = "Walk-forward validation of moving-average crossover strategies")]
#[command(long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the price data comes from, with overrides for the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding <SYMBOL>.csv price files
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Ticker to analyze
    #[arg(short, long)]
    pub symbol: Option<String>,

    /// Company to analyze, by its name in `instruments`
    #[arg(long, conflicts_with = "symbol")]
    pub company: Option<String>,

    /// Annual dividend yield in percent
    #[arg(long)]
    pub dividend_yield: Option<f64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Full report: selected pair, buy-and-hold and walk-forward estimate
    Report {
        #[command(flatten)]
        source: SourceArgs,

        /// Short moving-average window (5-50)
        #[arg(long)]
        short: Option<usize>,

        /// Long moving-average window (51-140)
        #[arg(long)]
        long: Option<usize>,

        /// Write the price and moving-average series to this CSV file
        #[arg(long)]
        chart_out: Option<PathBuf>,
    },

    /// Walk-forward validation only
    Validate {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Buy-and-hold baseline only
    BuyHold {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// List the selectable instruments
    Instruments,

    /// Generate an example configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "stockcross.toml")]
        output: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    /// Initialize logging based on verbosity level.
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();

        if tracing::subscriber::set_global_default(subscriber).is_err() {
            eprintln!("Logging was already initialized");
        }
    }
}

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    match &cli.command {
        Commands::Report {
            source,
            short,
            long,
            chart_out,
        } => run_report(source, *short, *long, chart_out.as_ref(), cli.output),
        Commands::Validate { source } => run_validate(source, cli.output),
        Commands::BuyHold { source } => run_buy_hold(source, cli.output),
        Commands::Instruments => {
            list_instruments(cli.output);
            Ok(())
        }
        Commands::Init { output } => init_config(output),
    }
}

/// Loaded configuration, price history and dividend yield.
struct Context {
    config: AnalysisFileConfig,
    series: PriceSeries,
    dividend_yield: Option<f64>,
}

fn load_context(source: &SourceArgs) -> Result<Context> {
    let mut config = match &source.config {
        Some(path) => AnalysisFileConfig::load(path)?,
        None => AnalysisFileConfig::default(),
    };
    if let Some(dir) = &source.data_dir {
        config.data.dir = dir.display().to_string();
    }
    if let Some(symbol) = resolve_symbol(source)? {
        config.data.symbol = symbol;
    }
    if source.dividend_yield.is_some() {
        config.data.dividend_yield_pct = source.dividend_yield;
    }

    let mut provider = CsvProvider::new(config.data_dir(), config.to_data_config());
    if let Some(yield_pct) = config.data.dividend_yield_pct {
        provider = provider.with_dividend_yield(config.data.symbol.clone(), yield_pct);
    }

    let (start, end) = config.history_range()?;
    info!(
        "Loading {} history from {} to {}",
        config.data.symbol, start, end
    );
    let series = provider.price_series(&config.data.symbol, start, end)?;
    let dividend_yield = provider.dividend_yield(&config.data.symbol)?;

    Ok(Context {
        config,
        series,
        dividend_yield,
    })
}

/// The ticker selected by `--symbol` or `--company`, if either was given.
fn resolve_symbol(source: &SourceArgs) -> Result<Option<String>> {
    match (&source.symbol, &source.company) {
        (Some(symbol), _) => Ok(Some(symbol.clone())),
        (None, Some(company)) => ticker_for(company)
            .map(|ticker| Some(ticker.to_string()))
            .ok_or_else(|| {
                BacktestError::ConfigError(format!(
                    "unknown company '{}'; run `stockcross instruments` for the list",
                    company
                ))
            }),
        (None, None) => Ok(None),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_report(
    source: &SourceArgs,
    short: Option<usize>,
    long: Option<usize>,
    chart_out: Option<&PathBuf>,
    output: OutputFormat,
) -> Result<()> {
    let mut ctx = load_context(source)?;
    if let Some(short) = short {
        ctx.config.strategy.short_window = short;
    }
    if let Some(long) = long {
        ctx.config.strategy.long_window = long;
    }

    let session: SessionConfig = ctx.config.to_session()?;
    let settings = ReportSettings::from_file(&ctx.config, ctx.dividend_yield)?;
    let report = build_report(&ctx.series, &session, &settings)?;

    if let Some(path) = chart_out {
        report.write_chart_csv(path)?;
        info!("Chart series written to {}", path.display());
    }

    match output {
        OutputFormat::Text => println!("{}", report.summary()),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(())
}

fn run_validate(source: &SourceArgs, output: OutputFormat) -> Result<()> {
    let ctx = load_context(source)?;
    let wf = &ctx.config.walkforward;
    let validator = WalkForwardValidator::new(wf.to_walkforward_config()?);
    let report = validator.run(&ctx.series, &wf.to_folds()?, &wf.to_grid()?)?;

    match output {
        OutputFormat::Text => println!("{}", report.summary()),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(())
}

fn run_buy_hold(source: &SourceArgs, output: OutputFormat) -> Result<()> {
    let ctx = load_context(source)?;
    let (start, end) = ctx.config.buy_and_hold_range()?;
    let result = buy_and_hold(
        &ctx.series,
        start,
        end,
        ctx.config.buy_and_hold.starting_cash,
        ctx.dividend_yield,
    )?;

    match output {
        OutputFormat::Text => println!("{}", result.summary()),
        OutputFormat::Json => print_json(&result)?,
    }
    Ok(())
}

fn list_instruments(output: OutputFormat) {
    match output {
        OutputFormat::Text => {
            println!("Available instruments:\n");
            for (name, ticker) in INSTRUMENTS {
                println!("  {:<10} {}", ticker, name);
            }
        }
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = INSTRUMENTS
                .iter()
                .map(|(name, ticker)| serde_json::json!({ "name": name, "ticker": ticker }))
                .collect();
            println!("{}", serde_json::Value::Array(rows));
        }
    }
}

fn init_config(output: &PathBuf) -> Result<()> {
    if output.exists() {
        return Err(BacktestError::ConfigError(format!(
            "{} already exists",
            output.display()
        )));
    }

    fs::write(output, AnalysisFileConfig::example())?;
    println!("Created example configuration file: {}", output.display());
    println!("\nEdit this file to point at your price data, then run:");
    println!("  stockcross report --config {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_report() {
        let cli = Cli::try_parse_from([
            "stockcross",
            "-o",
            "json",
            "report",
            "-d",
            "data",
            "-s",
            "2222.SR",
            "--short",
            "20",
            "--long",
            "90",
        ])
        .unwrap();

        match cli.command {
            Commands::Report {
                source,
                short,
                long,
                ..
            } => {
                assert_eq!(source.symbol.as_deref(), Some("2222.SR"));
                assert_eq!(short, Some(20));
                assert_eq!(long, Some(90));
            }
            _ => panic!("expected report command"),
        }
    }

    #[test]
    fn test_company_resolves_to_ticker() {
        let cli = Cli::try_parse_from([
            "stockcross",
            "buy-hold",
            "--company",
            "Saudi Telecom Company",
        ])
        .unwrap();

        match cli.command {
            Commands::BuyHold { source } => {
                assert_eq!(resolve_symbol(&source).unwrap().as_deref(), Some("7010.SR"));
            }
            _ => panic!("expected buy-hold command"),
        }

        let unknown = SourceArgs {
            company: Some("Acme Widgets".to_string()),
            ..SourceArgs::default()
        };
        assert!(matches!(
            resolve_symbol(&unknown),
            Err(BacktestError::ConfigError(_))
        ));
        assert_eq!(resolve_symbol(&SourceArgs::default()).unwrap(), None);
    }

    #[test]
    fn test_company_conflicts_with_symbol() {
        let cli = Cli::try_parse_from([
            "stockcross",
            "validate",
            "-s",
            "2222.SR",
            "--company",
            "Riyad Bank",
        ]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_instruments_command() {
        let cli = Cli::try_parse_from(["stockcross", "instruments"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_validate_with_config() {
        let cli = Cli::try_parse_from(["stockcross", "validate", "-c", "stockcross.toml"]);
        assert!(cli.is_ok());
    }
}
