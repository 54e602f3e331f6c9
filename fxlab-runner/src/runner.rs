//! Backtest runner: loads every configured pair, simulates them in parallel,
//! and assembles the combined report.
//!
//! Each pair runs from the configured initial balance on its own. The combined
//! trade log is the concatenation of all pairs' trades ordered by exit time,
//! and every aggregate in the report is derived from that log.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use fxlab_core::domain::{PriceBar, Position, Trade};
use fxlab_core::engine::{backtest_series, SimulationDiagnostics, SimulationResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calendar::CalendarBreakdown;
use crate::config::{BacktestConfig, ConfigWarning};
use crate::data_loader::{dataset_hash, load_symbol, synthetic_bars};
use crate::equity::{equity_curve, EquityPoint, EquitySummary};
use crate::metrics::MetricsRecord;
use crate::monte_carlo::{run_monte_carlo, MonteCarloOutcome};
use crate::targets::TargetComparison;
use crate::walk_forward::{run_walk_forward, WalkForwardOutcome};

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

// ─── Inputs ──────────────────────────────────────────────────────────

/// Where price series come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// `<data_dir>/<SYMBOL>.csv` per pair.
    Csv { data_dir: PathBuf },
    /// Deterministic random walks; results are tagged synthetic.
    Synthetic {
        start: NaiveDateTime,
        bars: usize,
        seed: u64,
    },
}

/// Inclusive calendar-date filter applied to loaded bars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        let day = timestamp.date();
        self.start.map_or(true, |s| day >= s) && self.end.map_or(true, |e| day <= e)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

// ─── Report types ────────────────────────────────────────────────────

/// Per-pair outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSummary {
    pub symbol: String,
    pub bars: usize,
    pub first_bar: Option<NaiveDateTime>,
    pub last_bar: Option<NaiveDateTime>,
    pub initial_balance: f64,
    pub final_balance: f64,
    pub metrics: MetricsRecord,
    pub diagnostics: SimulationDiagnostics,
    /// Left open at the end of the series; not part of any metric.
    pub open_position: Option<Position>,
}

/// A configured pair that produced no usable series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

/// Everything one run produces. Serialized as `backtest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config_hash: String,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub config: BacktestConfig,
    pub symbols: Vec<SymbolSummary>,
    #[serde(default)]
    pub skipped_symbols: Vec<SkippedSymbol>,
    /// Settings that fell back to defaults while loading the configuration.
    #[serde(default)]
    pub config_warnings: Vec<ConfigWarning>,
    /// All pairs' trades, ordered by exit time.
    pub trades: Vec<Trade>,
    pub metrics: MetricsRecord,
    pub equity_curve: Vec<EquityPoint>,
    pub equity_summary: EquitySummary,
    pub calendar: CalendarBreakdown,
    pub targets: TargetComparison,
    #[serde(default)]
    pub monte_carlo: Option<MonteCarloOutcome>,
    #[serde(default)]
    pub walk_forward: Option<WalkForwardOutcome>,
}

impl BacktestReport {
    /// Assemble the combined report from per-pair simulation results.
    pub fn from_results(
        config: &BacktestConfig,
        dataset_hash: String,
        has_synthetic: bool,
        series: &[(String, Vec<PriceBar>)],
        results: Vec<SimulationResult>,
        skipped_symbols: Vec<SkippedSymbol>,
    ) -> Self {
        let initial_balance = config.initial_balance;

        let symbols: Vec<SymbolSummary> = results
            .iter()
            .zip(series)
            .map(|(result, (_, bars))| SymbolSummary {
                symbol: result.symbol.clone(),
                bars: bars.len(),
                first_bar: bars.first().map(|b| b.timestamp),
                last_bar: bars.last().map(|b| b.timestamp),
                initial_balance: result.initial_balance,
                final_balance: result.final_balance,
                metrics: MetricsRecord::compute(&result.trades),
                diagnostics: result.diagnostics.clone(),
                open_position: result.open_position.clone(),
            })
            .collect();

        let mut trades: Vec<Trade> = results.into_iter().flat_map(|r| r.trades).collect();
        trades.sort_by_key(|t| t.exit_time);

        let metrics = MetricsRecord::compute(&trades);
        let curve = equity_curve(&trades, initial_balance);
        let equity_summary = EquitySummary::from_curve(&curve, initial_balance);
        let calendar = CalendarBreakdown::from_trades(&trades, initial_balance);
        let targets = TargetComparison::evaluate(metrics.net_profit, initial_balance, &config.targets);

        Self {
            schema_version: SCHEMA_VERSION,
            config_hash: config.config_hash(),
            dataset_hash,
            has_synthetic,
            config: config.clone(),
            symbols,
            skipped_symbols,
            config_warnings: Vec::new(),
            trades,
            metrics,
            equity_curve: curve,
            equity_summary,
            calendar,
            targets,
            monte_carlo: None,
            walk_forward: None,
        }
    }

    /// Trade P&L in exit order.
    pub fn pnls(&self) -> Vec<f64> {
        self.trades.iter().map(|t| t.pnl).collect()
    }

    pub fn final_balance(&self) -> f64 {
        self.config.initial_balance + self.metrics.net_profit
    }

    /// Record the fallbacks taken while loading this run's configuration.
    pub fn record_config_warnings(&mut self, warnings: Vec<ConfigWarning>) {
        self.config_warnings = warnings;
    }

    /// Bootstrap the trade P&L with the report's own configuration.
    pub fn attach_monte_carlo(&mut self) -> &MonteCarloOutcome {
        let outcome = run_monte_carlo(&self.pnls(), &self.config.monte_carlo());
        self.monte_carlo.insert(outcome)
    }

    /// Rolling-window analysis of the trade log with the report's own configuration.
    pub fn attach_walk_forward(&mut self) -> &WalkForwardOutcome {
        let outcome = run_walk_forward(&self.trades, &self.config.walk_forward());
        self.walk_forward.insert(outcome)
    }
}

// ─── Running ─────────────────────────────────────────────────────────

/// Load every configured pair. Pairs that fail to load are skipped, not fatal.
pub fn load_series(
    config: &BacktestConfig,
    source: &DataSource,
    range: DateRange,
) -> (Vec<(String, Vec<PriceBar>)>, Vec<SkippedSymbol>) {
    let mut series = Vec::new();
    let mut skipped = Vec::new();

    for symbol in &config.trading_pairs {
        let loaded = match source {
            DataSource::Csv { data_dir } => load_symbol(data_dir, symbol).map_err(|e| e.to_string()),
            DataSource::Synthetic { start, bars, seed } => {
                Ok(synthetic_bars(symbol, *start, *bars, *seed))
            }
        };
        let bars = match loaded {
            Ok(bars) if range.is_unbounded() => bars,
            Ok(bars) => bars.into_iter().filter(|b| range.contains(b.timestamp)).collect(),
            Err(reason) => {
                warn!(symbol = symbol.as_str(), %reason, "skipping pair");
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason,
                });
                continue;
            }
        };
        if bars.is_empty() {
            warn!(symbol = symbol.as_str(), "no bars in the requested date range; skipping pair");
            skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: "no bars in date range".into(),
            });
            continue;
        }
        series.push((symbol.clone(), bars));
    }
    (series, skipped)
}

/// Run the full backtest for every configured pair.
///
/// Monte Carlo and walk-forward are not run here; see
/// [`BacktestReport::attach_monte_carlo`] and [`BacktestReport::attach_walk_forward`].
pub fn run_backtest(config: &BacktestConfig, source: &DataSource, range: DateRange) -> BacktestReport {
    let (series, skipped) = load_series(config, source, range);
    let has_synthetic = matches!(source, DataSource::Synthetic { .. });
    run_backtest_on(config, series, skipped, has_synthetic)
}

/// Run pre-loaded series. No I/O.
pub fn run_backtest_on(
    config: &BacktestConfig,
    series: Vec<(String, Vec<PriceBar>)>,
    skipped: Vec<SkippedSymbol>,
    has_synthetic: bool,
) -> BacktestReport {
    info!(
        pairs = series.len(),
        skipped = skipped.len(),
        initial_balance = config.initial_balance,
        "running backtest"
    );

    let strategy = config.strategy();
    let results: Vec<SimulationResult> = series
        .par_iter()
        .map(|(symbol, bars)| backtest_series(symbol, bars, &strategy, config.initial_balance))
        .collect();

    let hash = dataset_hash(series.iter().map(|(_, bars)| bars.as_slice()));
    let report = BacktestReport::from_results(config, hash, has_synthetic, &series, results, skipped);

    info!(
        trades = report.metrics.total_trades,
        net_profit = report.metrics.net_profit,
        win_rate = report.metrics.win_rate,
        "backtest finished"
    );
    report
}
