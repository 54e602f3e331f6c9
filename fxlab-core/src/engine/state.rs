//! Simulator state, diagnostics, and run result types.

use crate::domain::{Position, Trade};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether the stream currently holds a position.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PositionState {
    #[default]
    Flat,
    InPosition(Position),
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn position(&self) -> Option<&Position> {
        match self {
            PositionState::Flat => None,
            PositionState::InPosition(p) => Some(p),
        }
    }
}

/// Counters gathered while walking a series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationDiagnostics {
    pub bars_processed: usize,
    /// Bars on which the daily loss limit was tripped.
    pub bars_halted_daily_loss: usize,
    /// Bars on which the consecutive-loss limit was tripped (and the daily one was not).
    pub bars_halted_consecutive_losses: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub conflicts: usize,
    /// Signals that arrived while a position was already open.
    pub signals_while_in_position: usize,
    /// Signals dropped because a gate was active.
    pub signals_gated: usize,
}

/// Mutable state threaded through every `step()` of one symbol stream.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub balance: f64,
    pub daily_pnl: f64,
    /// Calendar day of the last processed bar.
    pub current_day: Option<NaiveDate>,
    pub consecutive_losses: u32,
    pub position: PositionState,
    /// Closed trades in close order.
    pub trades: Vec<Trade>,
    pub diagnostics: SimulationDiagnostics,
}

impl SimulationState {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            balance: initial_balance,
            daily_pnl: 0.0,
            current_day: None,
            consecutive_losses: 0,
            position: PositionState::Flat,
            trades: Vec::new(),
            diagnostics: SimulationDiagnostics::default(),
        }
    }

    /// Reset the daily accumulator when `day` differs from the last seen day.
    pub fn roll_day(&mut self, day: NaiveDate) {
        if self.current_day != Some(day) {
            self.current_day = Some(day);
            self.daily_pnl = 0.0;
        }
    }

    /// Book a closed trade against balance, daily P&L, and the loss streak.
    pub fn record_trade(&mut self, trade: Trade) {
        self.balance += trade.pnl;
        self.daily_pnl += trade.pnl;
        if trade.pnl < 0.0 {
            self.consecutive_losses += 1;
        } else {
            self.consecutive_losses = 0;
        }
        self.trades.push(trade);
    }
}

/// Outcome of simulating one symbol stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub symbol: String,
    pub initial_balance: f64,
    pub final_balance: f64,
    pub trades: Vec<Trade>,
    /// Position still open when the series ended. Not force-closed.
    pub open_position: Option<Position>,
    pub diagnostics: SimulationDiagnostics,
}

impl SimulationResult {
    pub fn empty(symbol: &str, initial_balance: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            initial_balance,
            final_balance: initial_balance,
            trades: Vec::new(),
            open_position: None,
            diagnostics: SimulationDiagnostics::default(),
        }
    }

    pub fn net_profit(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }
}
