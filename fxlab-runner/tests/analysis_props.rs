//! Property tests over arbitrary trade logs.
//!
//! 1. Metrics stay in range and agree with the raw P&L
//! 2. Equity curve and calendar totals reconcile with net profit
//! 3. Monte Carlo trials only ever resample the given P&L

use chrono::{Duration, NaiveDate};
use fxlab_core::domain::{Direction, ExitReason, Trade};
use fxlab_runner::calendar::CalendarBreakdown;
use fxlab_runner::equity::{equity_curve, EquitySummary};
use fxlab_runner::metrics::{MetricsRecord, ProfitFactor};
use fxlab_runner::monte_carlo::{run_monte_carlo, MonteCarloConfig};
use proptest::prelude::*;

fn trades_from(pnls: &[f64], gaps_hours: &[i64]) -> Vec<Trade> {
    let mut entry = NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();
    pnls.iter()
        .zip(gaps_hours.iter().cycle())
        .map(|(&pnl, &gap)| {
            entry += Duration::hours(gap);
            Trade {
                symbol: if gap % 2 == 0 { "EURUSD" } else { "USDJPY" }.into(),
                direction: Direction::Long,
                entry_bar: 0,
                entry_time: entry,
                entry_price: 1.0,
                exit_bar: 1,
                exit_time: entry + Duration::minutes(30),
                exit_price: 1.0,
                exit_reason: if pnl >= 0.0 {
                    ExitReason::TakeProfit
                } else {
                    ExitReason::StopLoss
                },
                lot_size: 0.01,
                stop_loss: 0.999,
                take_profit: 1.001,
                pnl,
                duration_secs: 1_800,
            }
        })
        .collect()
}

fn pnl_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-50.0f64..50.0, 1..60)
}

fn gap_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1i64..72, 1..10)
}

proptest! {
    // ── 1. Metrics ──
    #[test]
    fn metrics_ranges(pnls in pnl_strategy()) {
        let m = MetricsRecord::from_pnls(&pnls);
        prop_assert!(m.win_rate >= 0.0 && m.win_rate <= 100.0);
        prop_assert!(m.max_drawdown >= 0.0);
        prop_assert!(m.gross_loss >= 0.0);
        prop_assert_eq!(m.winning_trades + m.losing_trades <= m.total_trades, true);
        prop_assert!((m.net_profit - pnls.iter().sum::<f64>()).abs() < 1e-9);
        prop_assert!((m.gross_profit - m.gross_loss - m.net_profit).abs() < 1e-9);
        match m.profit_factor {
            ProfitFactor::Infinite => prop_assert!(m.gross_loss == 0.0 && m.gross_profit > 0.0),
            ProfitFactor::Finite(v) => prop_assert!(v >= 0.0),
        }
    }

    // ── 2. Reconciliation ──
    #[test]
    fn equity_and_calendar_reconcile(pnls in pnl_strategy(), gaps in gap_strategy()) {
        let trades = trades_from(&pnls, &gaps);
        let net: f64 = pnls.iter().sum();

        let curve = equity_curve(&trades, 100.0);
        prop_assert_eq!(curve.len(), trades.len());
        let last = curve.last().unwrap();
        prop_assert!((last.balance - (100.0 + net)).abs() < 1e-9);
        prop_assert!(curve.iter().all(|p| p.drawdown <= 0.0));

        let summary = EquitySummary::from_curve(&curve, 100.0);
        prop_assert!(summary.max_drawdown >= 0.0);
        prop_assert!(summary.min_balance <= summary.max_balance);

        let calendar = CalendarBreakdown::from_trades(&trades, 100.0);
        let daily: f64 = calendar.daily.iter().map(|d| d.pnl).sum();
        let monthly: f64 = calendar.monthly.iter().map(|d| d.pnl).sum();
        prop_assert!((daily - net).abs() < 1e-9);
        prop_assert!((monthly - net).abs() < 1e-9);
        let daily_trades: usize = calendar.daily.iter().map(|d| d.trades).sum();
        prop_assert_eq!(daily_trades, trades.len());
    }

    // ── 3. Bootstrap bounds ──
    #[test]
    fn bootstrap_stays_within_pool(pnls in pnl_strategy(), seed in any::<u64>()) {
        let config = MonteCarloConfig { runs: 20, seed, ..MonteCarloConfig::default() };
        let outcome = run_monte_carlo(&pnls, &config);
        let report = outcome.report().unwrap();
        let lo = pnls.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = pnls.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let n = pnls.len() as f64;
        for run in &report.runs {
            prop_assert!(run.net_profit >= lo * n - 1e-6);
            prop_assert!(run.net_profit <= hi * n + 1e-6);
            prop_assert!(run.win_rate >= 0.0 && run.win_rate <= 100.0);
        }
        let probs = &report.target_probabilities;
        prop_assert!((probs.breakeven + probs.loss - 1.0).abs() < 1e-12);
    }
}
