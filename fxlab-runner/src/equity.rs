//! Account equity curve built from realized P&L in exit-time order.

use chrono::NaiveDateTime;
use fxlab_core::domain::Trade;
use serde::{Deserialize, Serialize};

/// Balance after one closed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub trade_pnl: f64,
    pub balance: f64,
    /// Percent change of balance against the initial balance.
    pub cumulative_return_pct: f64,
    /// Balance minus the running peak balance (zero or negative).
    pub drawdown: f64,
    pub drawdown_pct: f64,
}

/// Headline figures for an equity curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquitySummary {
    pub initial_balance: f64,
    pub final_balance: f64,
    pub total_return_pct: f64,
    pub max_balance: f64,
    pub min_balance: f64,
    /// Deepest drawdown as a positive amount.
    pub max_drawdown: f64,
    /// Deepest drawdown as a positive percent of the peak it fell from.
    pub max_drawdown_pct: f64,
}

fn pct_of(value: f64, base: f64) -> f64 {
    if base == 0.0 {
        0.0
    } else {
        value / base * 100.0
    }
}

/// Build the curve. Trades are stable-sorted by exit time first.
///
/// The running peak starts at the first post-trade balance.
pub fn equity_curve(trades: &[Trade], initial_balance: f64) -> Vec<EquityPoint> {
    let mut ordered: Vec<&Trade> = trades.iter().collect();
    ordered.sort_by_key(|t| t.exit_time);

    let mut balance = initial_balance;
    let mut peak = f64::NEG_INFINITY;
    ordered
        .into_iter()
        .map(|t| {
            balance += t.pnl;
            peak = peak.max(balance);
            let drawdown = balance - peak;
            EquityPoint {
                timestamp: t.exit_time,
                symbol: t.symbol.clone(),
                trade_pnl: t.pnl,
                balance,
                cumulative_return_pct: pct_of(balance - initial_balance, initial_balance),
                drawdown,
                drawdown_pct: pct_of(drawdown, peak),
            }
        })
        .collect()
}

impl EquitySummary {
    pub fn from_curve(curve: &[EquityPoint], initial_balance: f64) -> Self {
        let Some(last) = curve.last() else {
            return Self {
                initial_balance,
                final_balance: initial_balance,
                max_balance: initial_balance,
                min_balance: initial_balance,
                ..Self::default()
            };
        };
        let balances = curve.iter().map(|p| p.balance);
        Self {
            initial_balance,
            final_balance: last.balance,
            total_return_pct: pct_of(last.balance - initial_balance, initial_balance),
            max_balance: balances.clone().fold(f64::NEG_INFINITY, f64::max),
            min_balance: balances.fold(f64::INFINITY, f64::min),
            max_drawdown: curve.iter().map(|p| p.drawdown).fold(0.0, f64::min).abs(),
            max_drawdown_pct: curve.iter().map(|p| p.drawdown_pct).fold(0.0, f64::min).abs(),
        }
    }
}
