//! FXLab CLI: run the backtest pipeline and manage its configuration.
//!
//! Commands:
//! - `run`: backtest every configured pair, then Monte Carlo and walk-forward,
//!   and write the artifact set
//! - `config`: print the effective configuration as a parameter file

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fxlab_runner::config::{BacktestConfig, ConfigWarning};
use fxlab_runner::export::{read_report, write_artifacts};
use fxlab_runner::monte_carlo::MonteCarloOutcome;
use fxlab_runner::runner::{run_backtest, BacktestReport, DataSource, DateRange};
use fxlab_runner::walk_forward::WalkForwardOutcome;

#[derive(Parser)]
#[command(
    name = "fxlab",
    version,
    about = "FXLab, a forex strategy backtester with Monte Carlo and walk-forward analysis"
)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest, resample, analyze windows, and write reports.
    Run(RunArgs),
    /// Print the effective configuration as a parameter file.
    Config {
        /// Parameter file to load; defaults are printed without one.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Parameter file (TOML or KEY = value lines).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding <SYMBOL>.csv price files.
    #[arg(long, default_value = "data", conflicts_with = "synthetic")]
    data_dir: PathBuf,

    /// Use deterministic synthetic random-walk data instead of CSV files.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Hourly bars per pair in synthetic mode.
    #[arg(long, default_value_t = 5_000, requires = "synthetic")]
    synthetic_bars: usize,

    /// Comma-separated pairs, overriding the config (e.g. EURUSD,USDJPY).
    #[arg(long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// First date to include (YYYY-MM-DD).
    #[arg(long)]
    start_date: Option<String>,

    /// Last date to include (YYYY-MM-DD).
    #[arg(long)]
    end_date: Option<String>,

    /// Output directory for reports.
    #[arg(long, default_value = "reports")]
    output_dir: PathBuf,

    /// Monte Carlo trials, overriding the config.
    #[arg(long)]
    monte_carlo_runs: Option<usize>,

    /// Master seed for Monte Carlo and synthetic data, overriding the config.
    #[arg(long)]
    seed: Option<u64>,

    /// Reuse backtest.json from the output directory instead of simulating.
    #[arg(long, default_value_t = false)]
    skip_backtest: bool,

    #[arg(long, default_value_t = false)]
    skip_monte_carlo: bool,

    #[arg(long, default_value_t = false)]
    skip_walk_forward: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => run_cmd(args),
        Commands::Config { config } => {
            let (config, warnings) = load_config(config.as_ref());
            for warning in &warnings {
                println!("# {warning}");
            }
            print!("{}", config.to_config_file());
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "fxlab=debug,fxlab_core=debug,fxlab_runner=debug"
    } else {
        "fxlab=info,fxlab_core=warn,fxlab_runner=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn load_config(path: Option<&PathBuf>) -> (BacktestConfig, Vec<ConfigWarning>) {
    match path {
        Some(path) => {
            let (config, warnings) = BacktestConfig::load(path);
            info!(path = %path.display(), warnings = warnings.len(), "configuration loaded");
            (config, warnings)
        }
        None => {
            info!("no config file given; using defaults");
            (BacktestConfig::default(), Vec::new())
        }
    }
}

fn parse_date(flag: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("--{flag} must be YYYY-MM-DD, got '{s}'"))
        })
        .transpose()
}

fn run_cmd(args: RunArgs) -> Result<()> {
    let (mut config, warnings) = load_config(args.config.as_ref());
    if !args.symbols.is_empty() {
        config.trading_pairs = args
            .symbols
            .iter()
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(runs) = args.monte_carlo_runs {
        if runs == 0 {
            bail!("--monte-carlo-runs must be at least 1");
        }
        config.monte_carlo_runs = runs;
    }
    if let Some(seed) = args.seed {
        config.monte_carlo_seed = seed;
    }

    let range = DateRange {
        start: parse_date("start-date", args.start_date.as_deref())?,
        end: parse_date("end-date", args.end_date.as_deref())?,
    };
    if let (Some(start), Some(end)) = (range.start, range.end) {
        if start > end {
            bail!("--start-date {start} is after --end-date {end}");
        }
    }

    info!(
        pairs = %config.trading_pairs.join(","),
        output = %args.output_dir.display(),
        monte_carlo_runs = config.monte_carlo_runs,
        "starting fxlab run"
    );

    let mut report = if args.skip_backtest {
        let mut report = read_report(&args.output_dir).with_context(|| {
            format!(
                "no usable results in {}; run without --skip-backtest first",
                args.output_dir.display()
            )
        })?;
        info!(trades = report.trades.len(), "reusing existing backtest results");
        adopt_analysis_settings(&mut report, &config);
        report
    } else {
        let source = if args.synthetic {
            let start = range
                .start
                .or(NaiveDate::from_ymd_opt(2024, 1, 1))
                .context("invalid synthetic start date")?
                .and_time(NaiveTime::MIN);
            warn!("using synthetic data; results are tagged as synthetic");
            DataSource::Synthetic {
                start,
                bars: args.synthetic_bars,
                seed: config.monte_carlo_seed,
            }
        } else {
            DataSource::Csv {
                data_dir: args.data_dir.clone(),
            }
        };
        run_backtest(&config, &source, range)
    };
    report.record_config_warnings(warnings);

    if report.symbols.is_empty() && !args.skip_backtest {
        bail!(
            "no pair produced usable data ({} skipped); check --data-dir or use --synthetic",
            report.skipped_symbols.len()
        );
    }
    if report.trades.is_empty() {
        warn!("backtest produced no trades");
    }

    if !args.skip_monte_carlo {
        report.attach_monte_carlo();
    }
    if !args.skip_walk_forward {
        report.attach_walk_forward();
    }

    let written = write_artifacts(&report, &args.output_dir)
        .with_context(|| format!("failed to write reports to {}", args.output_dir.display()))?;

    print_summary(&report);
    println!();
    println!("Reports ({}) saved to: {}", written.len(), args.output_dir.display());
    Ok(())
}

/// Reloaded reports keep their backtest but take analysis settings from this run.
fn adopt_analysis_settings(report: &mut BacktestReport, config: &BacktestConfig) {
    report.config.monte_carlo_runs = config.monte_carlo_runs;
    report.config.monte_carlo_confidence_level = config.monte_carlo_confidence_level;
    report.config.monte_carlo_seed = config.monte_carlo_seed;
    report.config.walk_forward_period_months = config.walk_forward_period_months;
    report.config.walk_forward_step_months = config.walk_forward_step_months;
    report.config_hash = report.config.config_hash();
}

fn print_summary(report: &BacktestReport) {
    let m = &report.metrics;
    println!();
    println!("=== FXLab Summary ===");
    println!(
        "Pairs:          {}",
        report
            .symbols
            .iter()
            .map(|s| s.symbol.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    for skipped in &report.skipped_symbols {
        println!("Skipped:        {} ({})", skipped.symbol, skipped.reason);
    }
    for warning in &report.config_warnings {
        println!("Config:         {warning}");
    }
    println!("Initial:        ${:.2}", report.config.initial_balance);
    println!("Final:          ${:.2}", report.final_balance());
    println!();
    println!("--- Backtest ---");
    println!("Trades:         {} ({} W / {} L)", m.total_trades, m.winning_trades, m.losing_trades);
    println!("Win Rate:       {:.1}%", m.win_rate);
    println!("Net Profit:     ${:.2}", m.net_profit);
    println!("Total Return:   {:.2}%", report.targets.actual_return);
    println!("Profit Factor:  {}", m.profit_factor);
    println!("Sharpe:         {:.3}", m.sharpe_ratio);
    println!("Max Drawdown:   ${:.2}", m.max_drawdown);
    println!("Expectancy:     ${:.4}", m.expectancy);
    println!("Rating:         {}", report.targets.rating.description());

    match &report.monte_carlo {
        Some(MonteCarloOutcome::Completed(mc)) => {
            let ci = &mc.confidence_intervals.total_return;
            println!();
            println!("--- Monte Carlo ({} runs) ---", mc.runs.len());
            println!("Mean Return:    {:.2}%", mc.summary.mean_total_return);
            println!(
                "{:.0}% Interval:   {:.2}% .. {:.2}%",
                mc.config.confidence_level, ci.lower, ci.upper
            );
            println!("P(loss):        {:.1}%", mc.target_probabilities.loss * 100.0);
        }
        Some(MonteCarloOutcome::NoTrades) => {
            println!();
            println!("--- Monte Carlo: no trades to resample ---");
        }
        None => {}
    }

    match &report.walk_forward {
        Some(WalkForwardOutcome::Completed(wf)) => {
            println!();
            println!("--- Walk-Forward ({} windows) ---", wf.summary.total_periods);
            println!("Avg Return:     {:.2}%", wf.summary.avg_return);
            println!("Profitable:     {:.1}%", wf.summary.profitable_rate);
        }
        Some(WalkForwardOutcome::NoCompleteWindow) => {
            println!();
            println!("--- Walk-Forward: history shorter than one window ---");
        }
        Some(WalkForwardOutcome::NoTrades) => {
            println!();
            println!("--- Walk-Forward: no trades ---");
        }
        None => {}
    }

    if report.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}
