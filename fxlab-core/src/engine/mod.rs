//! Trade simulation engine: one symbol stream, one position at a time.
//!
//! The engine consumes a validated price series, derives indicators and
//! signals, then walks the bars through the `Flat` / `InPosition` state
//! machine under the configured risk gates.

pub mod risk;
pub mod simulator;
pub mod state;

pub use risk::{round_lots, Gate, GateScope, RiskConfig, MAX_LOTS, MIN_LOTS};
pub use simulator::{Simulator, StepReport};
pub use state::{PositionState, SimulationDiagnostics, SimulationResult, SimulationState};

use crate::domain::PriceBar;
use crate::indicators::{compute_indicators, IndicatorSettings};
use crate::signals::{generate_signals, SignalThresholds};
use tracing::info;

/// Everything needed to backtest one symbol end to end.
#[derive(Debug, Clone, Default)]
pub struct StrategyConfig {
    pub indicators: IndicatorSettings,
    pub thresholds: SignalThresholds,
    pub risk: RiskConfig,
}

/// Indicators → signals → simulation for a single symbol's series.
///
/// A malformed or empty series produces an empty result.
pub fn backtest_series(
    symbol: &str,
    bars: &[PriceBar],
    strategy: &StrategyConfig,
    initial_balance: f64,
) -> SimulationResult {
    let indicator_bars = compute_indicators(bars, &strategy.indicators);
    if indicator_bars.is_empty() {
        return SimulationResult::empty(symbol, initial_balance);
    }
    let signals = generate_signals(&indicator_bars, &strategy.thresholds);
    let result = Simulator::for_symbol(symbol, strategy.risk.clone()).simulate(
        &indicator_bars,
        &signals,
        initial_balance,
    );
    info!(
        symbol,
        bars = bars.len(),
        trades = result.trades.len(),
        final_balance = result.final_balance,
        "backtest complete"
    );
    result
}
