//! Risk settings: position sizing and the trading-halt gates.

use serde::{Deserialize, Serialize};

/// Smallest tradable size in standard lots.
pub const MIN_LOTS: f64 = 0.01;

/// Largest size the sizer will ever return.
pub const MAX_LOTS: f64 = 1.0;

/// What a tripped gate suppresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateScope {
    /// No position management at all: open positions are not closed either.
    #[default]
    AllManagement,
    /// Open positions may still hit stop or target; only new entries are blocked.
    EntriesOnly,
}

/// A trading halt condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    DailyLossLimit,
    ConsecutiveLosses,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Percent of balance risked per trade.
    pub risk_per_trade_pct: f64,
    /// Percent of balance the day may lose before trading halts.
    pub daily_loss_limit_pct: f64,
    pub stop_loss_pips: f64,
    pub take_profit_pips: f64,
    pub max_consecutive_losses: u32,
    pub gate_scope: GateScope,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade_pct: 0.5,
            daily_loss_limit_pct: 3.0,
            stop_loss_pips: 8.0,
            take_profit_pips: 12.0,
            max_consecutive_losses: 3,
            gate_scope: GateScope::AllManagement,
        }
    }
}

impl RiskConfig {
    /// First gate that currently halts trading, if any.
    ///
    /// The daily limit is relative to the current balance, not the day's opening balance.
    pub fn active_gate(&self, balance: f64, daily_pnl: f64, consecutive_losses: u32) -> Option<Gate> {
        if daily_pnl <= -balance * self.daily_loss_limit_pct / 100.0 {
            Some(Gate::DailyLossLimit)
        } else if consecutive_losses >= self.max_consecutive_losses {
            Some(Gate::ConsecutiveLosses)
        } else {
            None
        }
    }

    /// Lots such that hitting the stop loses `risk_per_trade_pct` of balance,
    /// clamped to `[MIN_LOTS, MAX_LOTS]` and rounded to 0.01.
    pub fn lot_size(&self, balance: f64, stop_distance: f64) -> f64 {
        let risk_amount = balance * self.risk_per_trade_pct / 100.0;
        let raw = risk_amount / (stop_distance * crate::domain::LOT_UNITS);
        if !raw.is_finite() {
            return MIN_LOTS;
        }
        round_lots(raw.clamp(MIN_LOTS, MAX_LOTS))
    }
}

/// Round to two decimals (0.01-lot granularity).
pub fn round_lots(lots: f64) -> f64 {
    (lots * 100.0).round() / 100.0
}
