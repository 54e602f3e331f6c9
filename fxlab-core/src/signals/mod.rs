//! Signal generation: indicator values in, discrete entry intent out.
//!
//! Signals are portfolio-agnostic. They see one indicator bar at a time and
//! never the simulator's position or balance.

use crate::domain::Direction;
use crate::indicators::IndicatorBar;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Entry intent for one bar. `buy` and `sell` are never both set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub buy: bool,
    pub sell: bool,
    /// Both raw conditions held; neither side fires.
    pub conflict: bool,
}

impl Signal {
    pub const NONE: Signal = Signal {
        buy: false,
        sell: false,
        conflict: false,
    };

    /// Direction to open, if any.
    pub fn direction(&self) -> Option<Direction> {
        match (self.buy, self.sell) {
            (true, false) => Some(Direction::Long),
            (false, true) => Some(Direction::Short),
            _ => None,
        }
    }

    fn from_conditions(buy: bool, sell: bool) -> Self {
        if buy && sell {
            Signal {
                buy: false,
                sell: false,
                conflict: true,
            }
        } else {
            Signal {
                buy,
                sell,
                conflict: false,
            }
        }
    }
}

/// Band-position and RSI thresholds for the trend-pullback rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    /// Buy requires `bb_position` strictly below this.
    pub buy_max_bb_position: f64,
    /// Sell requires `bb_position` strictly above this.
    pub sell_min_bb_position: f64,
    /// Buy requires RSI strictly below this.
    pub overbought: f64,
    /// Sell requires RSI strictly above this.
    pub oversold: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            buy_max_bb_position: 0.3,
            sell_min_bb_position: 0.7,
            overbought: 70.0,
            oversold: 30.0,
        }
    }
}

/// Evaluate the entry rule on a single bar.
///
/// Buy: price above both EMAs, fast above slow, near the lower band, not overbought.
/// Sell: the mirror image. Any undefined input means no signal.
pub fn evaluate(bar: &IndicatorBar, thresholds: &SignalThresholds) -> Signal {
    let (Some(fast), Some(slow), Some(bb_pos), Some(rsi)) =
        (bar.ema_fast, bar.ema_slow, bar.bb_position, bar.rsi)
    else {
        return Signal::NONE;
    };
    let close = bar.bar.close;

    let buy = close > fast
        && close > slow
        && fast > slow
        && bb_pos < thresholds.buy_max_bb_position
        && rsi < thresholds.overbought;
    let sell = close < fast
        && close < slow
        && fast < slow
        && bb_pos > thresholds.sell_min_bb_position
        && rsi > thresholds.oversold;

    Signal::from_conditions(buy, sell)
}

/// Evaluate every bar of a series; output has the same length.
pub fn generate_signals(bars: &[IndicatorBar], thresholds: &SignalThresholds) -> Vec<Signal> {
    let signals: Vec<Signal> = bars.iter().map(|b| evaluate(b, thresholds)).collect();
    let conflicts = signals.iter().filter(|s| s.conflict).count();
    if conflicts > 0 {
        debug!(conflicts, "suppressed conflicting buy/sell signals");
    }
    signals
}
