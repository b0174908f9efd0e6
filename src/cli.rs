//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvPriceSource;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{parse_date, validate_backtest_config, validate_data_config};
use crate::domain::cost_model::FinancingBasis;
use crate::domain::error::LedgersimError;
use crate::domain::policy::{Orders, Policy};
use crate::domain::price_series::PriceSlice;
use crate::domain::universe::{parse_universe, Universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceSource;
use crate::ports::report_port::ReportPort;

const DEFAULT_OUTPUT: &str = "results.csv";

#[derive(Parser, Debug)]
#[command(name = "ledgersim", about = "Daily backtesting engine")]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. info, debug, ledgersim=trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an equal-weight buy-and-hold backtest over the configured universe
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the price table's coverage for the configured universe
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            output,
            dry_run,
        } => run_backtest(&config, output.as_deref(), dry_run),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config } => run_info(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, LedgersimError> {
    FileConfigAdapter::from_file(path).map_err(|e| LedgersimError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, LedgersimError> {
    let start_date = parse_date(
        adapter.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        adapter.get_string("backtest", "end_date").as_deref(),
        "end_date",
    )?;

    let universe = adapter
        .get_string("backtest", "universe")
        .ok_or_else(|| LedgersimError::ConfigMissing {
            section: "backtest".into(),
            key: "universe".into(),
        })?;
    let universe = parse_universe(&universe)?;

    let financing_basis = match adapter.get_string("backtest", "financing_basis") {
        Some(s) => s
            .parse::<FinancingBasis>()
            .map_err(|reason| LedgersimError::ConfigInvalid {
                section: "backtest".into(),
                key: "financing_basis".into(),
                reason,
            })?,
        None => FinancingBasis::default(),
    };

    Ok(BacktestConfig {
        start_date,
        end_date,
        initial_cash: adapter.get_double("backtest", "initial_cash", 0.0),
        universe: universe.into_instruments(),
        execution_cost_bps: adapter.get_double("backtest", "execution_cost_bps", 0.0),
        financing_cost: adapter.get_double("backtest", "financing_cost", 0.0),
        financing_basis,
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", 0.0),
    })
}

/// Price table location from `[data] prices_path`, relative to the config file.
pub fn resolve_prices_path(adapter: &dyn ConfigPort, config_path: &Path) -> Result<PathBuf, LedgersimError> {
    let raw = adapter
        .get_string("data", "prices_path")
        .ok_or_else(|| LedgersimError::ConfigMissing {
            section: "data".into(),
            key: "prices_path".into(),
        })?;
    let path = PathBuf::from(raw);
    if path.is_relative() {
        if let Some(dir) = config_path.parent() {
            return Ok(dir.join(path));
        }
    }
    Ok(path)
}

/// `--output`, then `[report] output_path`, then `results.csv`.
pub fn resolve_output_path(output: Option<&Path>, adapter: &dyn ConfigPort) -> PathBuf {
    output
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("report", "output_path").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
}

/// Client policy used by the `backtest` command: on the first period, split cash
/// equally across every priced instrument and hold until the end.
#[derive(Debug, Default)]
pub struct EqualWeightBuyAndHold {
    invested: bool,
}

impl Policy for EqualWeightBuyAndHold {
    fn on_period(&mut self, _date: NaiveDate, prices: &PriceSlice<'_>, orders: &mut Orders<'_>) {
        if self.invested {
            return;
        }
        self.invested = true;

        let priced: Vec<(&str, f64)> = prices.iter().filter(|(_, p)| *p > 0.0).collect();
        if priced.is_empty() {
            return;
        }

        let budget = orders.cash() / priced.len() as f64;
        let rate = orders.costs().execution_rate();
        for (instrument, price) in priced {
            let quantity = (budget / (price * (1.0 + rate))).floor();
            if quantity > 0.0 {
                let _ = orders.buy(instrument, quantity);
            }
        }
    }
}

/// Fetch prices, run the engine and write the results.
pub fn run_backtest_pipeline(
    source: &dyn PriceSource,
    report: &dyn ReportPort,
    config: &BacktestConfig,
    policy: &mut dyn Policy,
    output_path: &Path,
) -> Result<BacktestResult, LedgersimError> {
    let universe = Universe::new(config.universe.clone())?;
    let prices = source.fetch_closes(&universe, config.start_date, config.end_date)?;
    if prices.is_empty() {
        return Err(LedgersimError::NoData {
            start: config.start_date,
            end: config.end_date,
        });
    }

    eprintln!(
        "Running backtest: {} instruments, {} to {}",
        universe.count(),
        config.start_date,
        config.end_date,
    );
    eprintln!("  Processing: {} dates", prices.len());

    let result = backtest_engine::run_backtest(prices, config, policy)?;

    print_summary(&result);

    report.write(&result.results, output_path)?;
    eprintln!("\nResults written to: {}", output_path.display());
    Ok(result)
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    eprintln!("\n=== Results ===");
    eprintln!("Final Value:      {:.2}", m.final_value);
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", m.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", m.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", m.max_drawdown * 100.0);
    eprintln!("Periods:          {}", m.periods);
    eprintln!("Rebalances:       {}", m.rebalance_count);
    eprintln!("Execution Fees:   {:.2}", result.ledger.fees_paid());
    eprintln!("Financing Paid:   {:.2}", result.ledger.financing_paid());

    if !result.ledger.positions().is_empty() {
        eprintln!("\n=== Open Positions ===");
        for (instrument, quantity) in result.ledger.positions() {
            eprintln!("  {}: {}", instrument, quantity);
        }
    }
}

fn load_validated(config_path: &Path) -> Result<(FileConfigAdapter, BacktestConfig), LedgersimError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter)?;
    validate_data_config(&adapter)?;
    let config = build_backtest_config(&adapter)?;
    Ok((adapter, config))
}

fn run_backtest(config_path: &Path, output: Option<&Path>, dry_run: bool) -> Result<(), LedgersimError> {
    let (adapter, config) = load_validated(config_path)?;
    let prices_path = resolve_prices_path(&adapter, config_path)?;
    let output_path = resolve_output_path(output, &adapter);

    if dry_run {
        print_config(&config, &prices_path, &output_path);
        eprintln!("\nDry run complete: configuration is valid");
        return Ok(());
    }

    let source = CsvPriceSource::new(prices_path);
    let report = CsvReportAdapter::new();
    let mut policy = EqualWeightBuyAndHold::default();
    run_backtest_pipeline(&source, &report, &config, &mut policy, &output_path)?;
    Ok(())
}

fn print_config(config: &BacktestConfig, prices_path: &Path, output_path: &Path) {
    eprintln!("\nBacktest:");
    eprintln!("  window:             {} to {}", config.start_date, config.end_date);
    eprintln!("  initial_cash:       {:.2}", config.initial_cash);
    eprintln!("  universe:           {}", config.universe.join(", "));
    eprintln!("  execution_cost_bps: {}", config.execution_cost_bps);
    eprintln!(
        "  financing_cost:     {} per period ({} basis)",
        config.financing_cost, config.financing_basis
    );
    eprintln!("  risk_free_rate:     {}", config.risk_free_rate);
    eprintln!("\nData:");
    eprintln!("  prices:             {}", prices_path.display());
    eprintln!("  output:             {}", output_path.display());
}

fn run_validate(config_path: &Path) -> Result<(), LedgersimError> {
    let (adapter, config) = load_validated(config_path)?;
    let prices_path = resolve_prices_path(&adapter, config_path)?;
    let output_path = resolve_output_path(None, &adapter);
    print_config(&config, &prices_path, &output_path);
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_info(config_path: &Path) -> Result<(), LedgersimError> {
    let (adapter, config) = load_validated(config_path)?;
    let source = CsvPriceSource::new(resolve_prices_path(&adapter, config_path)?);

    let available = source.list_instruments()?;
    println!("instruments: {}", available.join(","));

    let universe = Universe::new(config.universe)?;
    let series = source.fetch_closes(&universe, config.start_date, config.end_date)?;
    match (series.first_date(), series.last_date()) {
        (Some(first), Some(last)) => {
            println!("{}: {} complete dates, {} to {}", universe.instruments().join(","), series.len(), first, last);
        }
        _ => {
            eprintln!(
                "no complete price rows for {} between {} and {}",
                universe.instruments().join(","),
                config.start_date,
                config.end_date
            );
        }
    }
    Ok(())
}
