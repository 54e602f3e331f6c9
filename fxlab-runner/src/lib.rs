//! FXLab Runner: multi-pair orchestration, performance analysis, and export.
//!
//! This crate builds on `fxlab-core` to provide:
//! - Configuration loading with per-key fallbacks
//! - CSV and synthetic price-series loading
//! - Parallel multi-pair backtests and the combined report
//! - Trade metrics, equity curve, calendar breakdowns, target rating
//! - Monte Carlo bootstrap of trade P&L
//! - Walk-forward window analysis
//! - CSV / JSON / Markdown artifacts

pub mod calendar;
pub mod config;
pub mod data_loader;
pub mod equity;
pub mod export;
pub mod metrics;
pub mod monte_carlo;
pub mod runner;
pub mod targets;
pub mod walk_forward;

pub use calendar::{CalendarBreakdown, PeriodPerformance, PeriodSummary};
pub use config::{BacktestConfig, ConfigWarning, WarningKind};
pub use data_loader::{load_price_csv, load_symbol, synthetic_bars, LoadError};
pub use equity::{equity_curve, EquityPoint, EquitySummary};
pub use export::{import_json, read_report, write_artifacts, ExportError};
pub use metrics::{MetricsRecord, ProfitFactor};
pub use monte_carlo::{
    run_monte_carlo, run_monte_carlo_with, ConfidenceInterval, MonteCarloConfig,
    MonteCarloOutcome, MonteCarloReport, SimulationRun,
};
pub use runner::{
    run_backtest, run_backtest_on, BacktestReport, DataSource, DateRange, SymbolSummary,
    SCHEMA_VERSION,
};
pub use targets::{PerformanceTargets, TargetComparison, TargetRating};
pub use walk_forward::{
    run_walk_forward, PeriodWindow, WalkForwardConfig, WalkForwardOutcome, WalkForwardReport,
};
