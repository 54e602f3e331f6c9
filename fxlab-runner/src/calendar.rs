//! Daily and monthly P&L breakdowns keyed by trade exit time.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;
use fxlab_core::domain::Trade;
use serde::{Deserialize, Serialize};

use crate::metrics::{mean, sample_std};

/// Realized results for one calendar day or month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodPerformance {
    /// `YYYY-MM-DD` for days, `YYYY-MM` for months.
    pub period: String,
    pub pnl: f64,
    pub trades: usize,
    pub avg_trade_pnl: f64,
    pub symbols: usize,
    pub cumulative_pnl: f64,
    /// Period P&L as a percent of the initial balance.
    pub return_pct: f64,
    pub cumulative_return_pct: f64,
    pub winning: bool,
}

/// Distribution of period results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub total_periods: usize,
    pub winning_periods: usize,
    /// Periods that were not winners (break-even included).
    pub losing_periods: usize,
    pub win_rate: f64,
    pub avg_pnl: f64,
    /// Sample standard deviation of period P&L.
    pub std_pnl: f64,
    pub best: f64,
    pub worst: f64,
    pub avg_trades: f64,
    pub max_trades: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarBreakdown {
    pub daily: Vec<PeriodPerformance>,
    pub daily_summary: PeriodSummary,
    pub monthly: Vec<PeriodPerformance>,
    pub monthly_summary: PeriodSummary,
}

impl CalendarBreakdown {
    pub fn from_trades(trades: &[Trade], initial_balance: f64) -> Self {
        let daily = group_by(trades, initial_balance, |t| {
            t.exit_time.date().format("%Y-%m-%d").to_string()
        });
        let monthly = group_by(trades, initial_balance, |t| {
            format!("{:04}-{:02}", t.exit_time.year(), t.exit_time.month())
        });
        Self {
            daily_summary: PeriodSummary::from_periods(&daily),
            monthly_summary: PeriodSummary::from_periods(&monthly),
            daily,
            monthly,
        }
    }
}

/// Group trades under a sortable period key, in ascending key order.
fn group_by<F>(trades: &[Trade], initial_balance: f64, key: F) -> Vec<PeriodPerformance>
where
    F: Fn(&Trade) -> String,
{
    let mut groups: BTreeMap<String, Vec<&Trade>> = BTreeMap::new();
    for t in trades {
        groups.entry(key(t)).or_default().push(t);
    }

    let pct = |v: f64| {
        if initial_balance == 0.0 {
            0.0
        } else {
            v * 100.0 / initial_balance
        }
    };

    let mut cumulative = 0.0;
    groups
        .into_iter()
        .map(|(period, members)| {
            let pnl: f64 = members.iter().map(|t| t.pnl).sum();
            let symbols: BTreeSet<&str> = members.iter().map(|t| t.symbol.as_str()).collect();
            cumulative += pnl;
            PeriodPerformance {
                period,
                pnl,
                trades: members.len(),
                avg_trade_pnl: pnl / members.len() as f64,
                symbols: symbols.len(),
                cumulative_pnl: cumulative,
                return_pct: pct(pnl),
                cumulative_return_pct: pct(cumulative),
                winning: pnl > 0.0,
            }
        })
        .collect()
}

impl PeriodSummary {
    pub fn from_periods(periods: &[PeriodPerformance]) -> Self {
        if periods.is_empty() {
            return Self::default();
        }
        let pnls: Vec<f64> = periods.iter().map(|p| p.pnl).collect();
        let trade_counts: Vec<f64> = periods.iter().map(|p| p.trades as f64).collect();
        let winning = periods.iter().filter(|p| p.winning).count();
        Self {
            total_periods: periods.len(),
            winning_periods: winning,
            losing_periods: periods.len() - winning,
            win_rate: winning as f64 / periods.len() as f64 * 100.0,
            avg_pnl: mean(&pnls),
            std_pnl: sample_std(&pnls),
            best: pnls.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            worst: pnls.iter().copied().fold(f64::INFINITY, f64::min),
            avg_trades: mean(&trade_counts),
            max_trades: periods.iter().map(|p| p.trades).max().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fxlab_core::domain::{Direction, ExitReason};

    fn trade(symbol: &str, y: i32, m: u32, d: u32, pnl: f64) -> Trade {
        let exit = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap();
        Trade {
            symbol: symbol.into(),
            direction: Direction::Long,
            entry_bar: 0,
            entry_time: exit - chrono::Duration::hours(1),
            entry_price: 1.0,
            exit_bar: 1,
            exit_time: exit,
            exit_price: 1.0,
            exit_reason: ExitReason::StopLoss,
            lot_size: 0.01,
            stop_loss: 0.9992,
            take_profit: 1.0012,
            pnl,
            duration_secs: 3600,
        }
    }

    #[test]
    fn daily_and_monthly_groups() {
        let trades = vec![
            trade("EURUSD", 2024, 1, 3, 5.0),
            trade("USDJPY", 2024, 1, 3, -2.0),
            trade("EURUSD", 2024, 1, 9, 3.0),
            trade("GBPUSD", 2024, 2, 1, -4.0),
        ];
        let cal = CalendarBreakdown::from_trades(&trades, 100.0);

        assert_eq!(cal.daily.len(), 3);
        assert_eq!(cal.daily[0].period, "2024-01-03");
        assert_eq!(cal.daily[0].pnl, 3.0);
        assert_eq!(cal.daily[0].trades, 2);
        assert_eq!(cal.daily[0].symbols, 2);
        assert_eq!(cal.daily[0].avg_trade_pnl, 1.5);
        assert_eq!(cal.daily[2].cumulative_pnl, 2.0);

        assert_eq!(cal.monthly.len(), 2);
        assert_eq!(cal.monthly[0].period, "2024-01");
        assert_eq!(cal.monthly[0].pnl, 6.0);
        assert_eq!(cal.monthly[0].return_pct, 6.0);
        assert!(!cal.monthly[1].winning);
        assert_eq!(cal.monthly[1].cumulative_return_pct, 2.0);
    }

    #[test]
    fn summary_statistics() {
        let trades = vec![
            trade("EURUSD", 2024, 3, 1, 10.0),
            trade("EURUSD", 2024, 3, 2, -4.0),
            trade("EURUSD", 2024, 3, 2, -2.0),
            trade("EURUSD", 2024, 3, 3, 0.0),
        ];
        let s = CalendarBreakdown::from_trades(&trades, 100.0).daily_summary;
        assert_eq!(s.total_periods, 3);
        assert_eq!(s.winning_periods, 1);
        assert_eq!(s.losing_periods, 2);
        assert_eq!(s.best, 10.0);
        assert_eq!(s.worst, -6.0);
        assert_eq!(s.max_trades, 2);
        assert!((s.avg_pnl - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn no_trades_no_periods() {
        let cal = CalendarBreakdown::from_trades(&[], 100.0);
        assert!(cal.daily.is_empty());
        assert_eq!(cal.monthly_summary, PeriodSummary::default());
    }
}
