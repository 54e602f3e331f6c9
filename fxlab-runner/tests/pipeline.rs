//! End-to-end runner tests on synthetic and CSV-backed data.
//!
//! 1. Combined equity curve ends at initial balance + net profit
//! 2. Runs are deterministic (same config, same data → same report)
//! 3. CSV round-trip of a synthetic series reproduces the synthetic run
//! 4. Monte Carlo is identical across thread-pool sizes
//! 5. Monte Carlo on a single trade collapses to a point
//! 6. Walk-forward windows over a 13-month trade log

use std::io::Write;
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use fxlab_core::domain::{Direction, ExitReason, PriceBar, Trade};
use fxlab_runner::config::BacktestConfig;
use fxlab_runner::monte_carlo::{run_monte_carlo, MonteCarloConfig, MonteCarloOutcome};
use fxlab_runner::runner::{run_backtest, DataSource, DateRange};
use fxlab_runner::walk_forward::{run_walk_forward, WalkForwardConfig, WalkForwardOutcome};

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn synthetic(seed: u64) -> DataSource {
    DataSource::Synthetic {
        start: start(),
        bars: 2_000,
        seed,
    }
}

fn write_series_csv(dir: &Path, symbol: &str, bars: &[PriceBar]) {
    let mut file = std::fs::File::create(dir.join(format!("{symbol}.csv"))).unwrap();
    writeln!(file, "timestamp,open,high,low,close,volume").unwrap();
    for b in bars {
        writeln!(
            file,
            "{},{},{},{},{},{}",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume.unwrap_or(0.0)
        )
        .unwrap();
    }
}

// ─── 1. Balance identity ─────────────────────────────────────────────

#[test]
fn equity_curve_matches_net_profit() {
    let config = BacktestConfig::default();
    let report = run_backtest(&config, &synthetic(3), DateRange::default());

    let net: f64 = report.trades.iter().map(|t| t.pnl).sum();
    assert!((report.metrics.net_profit - net).abs() < 1e-9);
    assert_eq!(report.equity_curve.len(), report.trades.len());
    if let Some(last) = report.equity_curve.last() {
        assert!((last.balance - (config.initial_balance + net)).abs() < 1e-9);
    }
    for t in &report.trades {
        assert!(t.exit_time > t.entry_time);
    }
}

// ─── 2. Determinism ──────────────────────────────────────────────────

#[test]
fn same_inputs_same_report() {
    let config = BacktestConfig::default();
    let a = run_backtest(&config, &synthetic(5), DateRange::default());
    let b = run_backtest(&config, &synthetic(5), DateRange::default());
    assert_eq!(a, b);
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.dataset_hash, b.dataset_hash);
}

// ─── 3. CSV source ───────────────────────────────────────────────────

#[test]
fn csv_source_reproduces_synthetic_run() {
    let mut config = BacktestConfig::default();
    config.trading_pairs = vec!["EURUSD".into(), "USDJPY".into()];
    let source = synthetic(9);
    let from_synthetic = run_backtest(&config, &source, DateRange::default());

    let dir = tempfile::tempdir().unwrap();
    for symbol in &config.trading_pairs {
        let bars = fxlab_runner::data_loader::synthetic_bars(symbol, start(), 2_000, 9);
        write_series_csv(dir.path(), symbol, &bars);
    }
    let csv_source = DataSource::Csv {
        data_dir: dir.path().to_path_buf(),
    };
    let from_csv = run_backtest(&config, &csv_source, DateRange::default());

    assert!(!from_csv.has_synthetic);
    assert_eq!(from_csv.dataset_hash, from_synthetic.dataset_hash);
    assert_eq!(from_csv.trades, from_synthetic.trades);
    assert_eq!(from_csv.metrics, from_synthetic.metrics);
}

#[test]
fn date_range_limits_bars() {
    let mut config = BacktestConfig::default();
    config.trading_pairs = vec!["GBPUSD".into()];
    let range = DateRange {
        start: NaiveDate::from_ymd_opt(2024, 1, 8),
        end: NaiveDate::from_ymd_opt(2024, 1, 31),
    };
    let report = run_backtest(&config, &synthetic(1), range);
    let summary = &report.symbols[0];
    assert!(summary.first_bar.unwrap().date() >= range.start.unwrap());
    assert!(summary.last_bar.unwrap().date() <= range.end.unwrap());
    assert!(report.trades.iter().all(|t| range.contains(t.entry_time)));
}

// ─── 4. Monte Carlo thread independence ──────────────────────────────

#[test]
fn monte_carlo_independent_of_thread_count() {
    let pnls = [50.0, -20.0, 30.0, -10.0, 40.0, -15.0, 25.0, -5.0, 60.0, -30.0];
    let config = MonteCarloConfig {
        runs: 200,
        ..MonteCarloConfig::default()
    };
    let run_with = |threads: usize| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap()
            .install(|| run_monte_carlo(&pnls, &config))
    };
    let single = run_with(1);
    let multi = run_with(4);
    assert_eq!(single, multi);
    let report = single.report().unwrap();
    assert_eq!(report.runs.len(), 200);
    assert!(report.runs.iter().all(|r| r.seed.is_some()));
}

// ─── 5. Degenerate bootstrap ─────────────────────────────────────────

#[test]
fn single_trade_bootstrap_is_a_point() {
    let config = MonteCarloConfig {
        runs: 100,
        initial_balance: 10.0,
        ..MonteCarloConfig::default()
    };
    let MonteCarloOutcome::Completed(report) = run_monte_carlo(&[100.0], &config) else {
        panic!("expected a completed bootstrap");
    };
    assert!(report.runs.iter().all(|r| (r.final_balance - 110.0).abs() < 1e-9));
    let ci = &report.confidence_intervals.final_balance;
    assert!((ci.lower - 110.0).abs() < 1e-9);
    assert!((ci.upper - 110.0).abs() < 1e-9);
    assert!(ci.std.abs() < 1e-9);
    assert_eq!(report.target_probabilities.day1, 1.0);
}

// ─── 6. Walk-forward ─────────────────────────────────────────────────

fn monthly_trade(month_offset: u32, pnl: f64) -> Trade {
    let entry = NaiveDate::from_ymd_opt(2023, 1, 10)
        .unwrap()
        .checked_add_months(chrono::Months::new(month_offset))
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    Trade {
        symbol: "AUDUSD".into(),
        direction: Direction::Long,
        entry_bar: 0,
        entry_time: entry,
        entry_price: 0.67,
        exit_bar: 1,
        exit_time: entry + Duration::hours(1),
        exit_price: 0.67,
        exit_reason: if pnl > 0.0 {
            ExitReason::TakeProfit
        } else {
            ExitReason::StopLoss
        },
        lot_size: 0.01,
        stop_loss: 0.6692,
        take_profit: 0.6712,
        pnl,
        duration_secs: 3_600,
    }
}

#[test]
fn thirteen_months_two_windows() {
    // One trade per month, Jan 2023 .. Feb 2024.
    let trades: Vec<Trade> = (0..14)
        .map(|m| monthly_trade(m, if m % 3 == 0 { -1.0 } else { 2.0 }))
        .collect();
    let outcome = run_walk_forward(&trades, &WalkForwardConfig::default());
    let WalkForwardOutcome::Completed(report) = outcome else {
        panic!("expected completed walk-forward, got {outcome:?}");
    };
    assert_eq!(report.windows.len(), 2);
    for w in &report.windows {
        let inside = trades
            .iter()
            .filter(|t| t.exit_time >= w.start && t.exit_time < w.end)
            .count();
        assert_eq!(w.metrics.total_trades, inside);
        assert_eq!(inside, 12);
    }
}
