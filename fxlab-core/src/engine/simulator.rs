//! Bar-by-bar trade simulation for one symbol stream.
//!
//! Per-bar order:
//! 1. Day roll: a new calendar date resets the daily P&L accumulator.
//! 2. Gates: daily loss limit, then consecutive-loss limit.
//! 3. Close: stop-loss or take-profit against the bar's close.
//! 4. Open: only from `Flat`, on a buy (long) or sell (short) signal.

use super::risk::{Gate, GateScope, RiskConfig};
use super::state::{PositionState, SimulationResult, SimulationState};
use crate::domain::{Direction, ExitReason, Instrument, Position, PriceBar, Trade};
use crate::indicators::IndicatorBar;
use crate::signals::Signal;
use tracing::{debug, trace, warn};

/// What happened on a single bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub halted_by: Option<Gate>,
    pub closed: Option<ExitReason>,
    pub opened: Option<Direction>,
}

/// Runs the trade state machine for one instrument.
#[derive(Debug, Clone)]
pub struct Simulator {
    instrument: Instrument,
    risk: RiskConfig,
}

impl Simulator {
    pub fn new(instrument: Instrument, risk: RiskConfig) -> Self {
        Self { instrument, risk }
    }

    pub fn for_symbol(symbol: &str, risk: RiskConfig) -> Self {
        Self::new(Instrument::from_symbol(symbol), risk)
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn risk(&self) -> &RiskConfig {
        &self.risk
    }

    /// Advance the state machine by one bar.
    pub fn step(
        &self,
        state: &mut SimulationState,
        index: usize,
        bar: &PriceBar,
        signal: &Signal,
    ) -> StepReport {
        let mut report = StepReport::default();

        // ── 1. Day roll ──
        state.roll_day(bar.timestamp.date());
        state.diagnostics.bars_processed += 1;
        if signal.buy {
            state.diagnostics.buy_signals += 1;
        }
        if signal.sell {
            state.diagnostics.sell_signals += 1;
        }
        if signal.conflict {
            state.diagnostics.conflicts += 1;
        }

        // ── 2. Gates ──
        let gate = self
            .risk
            .active_gate(state.balance, state.daily_pnl, state.consecutive_losses);
        if let Some(gate) = gate {
            match gate {
                Gate::DailyLossLimit => state.diagnostics.bars_halted_daily_loss += 1,
                Gate::ConsecutiveLosses => state.diagnostics.bars_halted_consecutive_losses += 1,
            }
            if signal.direction().is_some() {
                state.diagnostics.signals_gated += 1;
            }
            trace!(index, ?gate, "trading halted");
            report.halted_by = Some(gate);
            if self.risk.gate_scope == GateScope::AllManagement {
                return report;
            }
        }

        // ── 3. Close ──
        report.closed = self.try_close(state, index, bar);

        // ── 4. Open ──
        if gate.is_none() {
            if let Some(direction) = signal.direction() {
                if state.position.is_flat() {
                    self.open(state, index, bar, direction);
                    report.opened = Some(direction);
                } else {
                    state.diagnostics.signals_while_in_position += 1;
                }
            }
        }

        report
    }

    fn try_close(
        &self,
        state: &mut SimulationState,
        index: usize,
        bar: &PriceBar,
    ) -> Option<ExitReason> {
        let reason = state.position.position()?.exit_trigger(bar.close)?;
        let PositionState::InPosition(position) = std::mem::take(&mut state.position) else {
            return None;
        };
        let trade = Trade::close(position, index, bar.timestamp, bar.close, reason);
        debug!(
            symbol = %trade.symbol,
            direction = ?trade.direction,
            ?reason,
            pnl = trade.pnl,
            "closed position"
        );
        state.record_trade(trade);
        Some(reason)
    }

    fn open(&self, state: &mut SimulationState, index: usize, bar: &PriceBar, direction: Direction) {
        debug_assert!(state.position.is_flat(), "open requested while in position");
        if !state.position.is_flat() {
            return;
        }

        let stop_distance = self.instrument.pips_to_price(self.risk.stop_loss_pips);
        let target_distance = self.instrument.pips_to_price(self.risk.take_profit_pips);
        let entry = bar.close;
        let sign = direction.sign();
        let position = Position {
            symbol: bar.symbol.clone(),
            direction,
            entry_bar: index,
            entry_time: bar.timestamp,
            entry_price: entry,
            lot_size: self.risk.lot_size(state.balance, stop_distance),
            stop_loss: entry - sign * stop_distance,
            take_profit: entry + sign * target_distance,
        };
        debug!(
            symbol = %position.symbol,
            ?direction,
            entry,
            lots = position.lot_size,
            "opened position"
        );
        state.position = PositionState::InPosition(position);
    }

    /// Walk a full indicator series with its signals.
    ///
    /// Series and signals are paired by index; a length mismatch is truncated
    /// to the shorter of the two.
    pub fn simulate(
        &self,
        bars: &[IndicatorBar],
        signals: &[Signal],
        initial_balance: f64,
    ) -> SimulationResult {
        if bars.len() != signals.len() {
            warn!(
                bars = bars.len(),
                signals = signals.len(),
                "bar and signal counts differ; truncating"
            );
        }

        let mut state = SimulationState::new(initial_balance);
        for (i, (bar, signal)) in bars.iter().zip(signals).enumerate() {
            self.step(&mut state, i, &bar.bar, signal);
        }

        let SimulationState {
            balance,
            position,
            trades,
            diagnostics,
            ..
        } = state;
        SimulationResult {
            symbol: self.instrument.symbol.clone(),
            initial_balance,
            final_balance: balance,
            trades,
            open_position: match position {
                PositionState::Flat => None,
                PositionState::InPosition(p) => Some(p),
            },
            diagnostics,
        }
    }
}
