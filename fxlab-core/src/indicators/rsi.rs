//! Relative Strength Index (RSI).
//!
//! Simple trailing means (not Wilder smoothing) of gains and losses:
//! RSI = 100 - 100 / (1 + mean_gain / mean_loss)
//! Lookback: period (first value at index `period`).
//! mean_loss == 0 → RSI = 100.

use super::sma::rolling_mean;
use super::Indicator;
use crate::domain::PriceBar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let n = bars.len();
        if n < self.period + 1 {
            return vec![f64::NAN; n];
        }

        // Index 0 has no delta; keep it NaN so the first full window ends at `period`.
        let mut gains = vec![f64::NAN; n];
        let mut losses = vec![f64::NAN; n];
        for i in 1..n {
            let change = bars[i].close - bars[i - 1].close;
            gains[i] = change.max(0.0);
            losses[i] = (-change).max(0.0);
        }

        let mean_gain = rolling_mean(&gains, self.period);
        let mean_loss = rolling_mean(&losses, self.period);

        mean_gain
            .iter()
            .zip(&mean_loss)
            .map(|(&g, &l)| {
                if g.is_nan() || l.is_nan() {
                    f64::NAN
                } else {
                    compute_rsi(g, l)
                }
            })
            .collect()
    }
}

fn compute_rsi(mean_gain: f64, mean_loss: f64) -> f64 {
    if mean_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + mean_gain / mean_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn rsi_all_gains() {
        let bars = make_bars(&[1.00, 1.01, 1.02, 1.03, 1.04, 1.05]);
        let result = Rsi::new(3).compute(&bars);
        assert_eq!(result[3], 100.0);
        assert_eq!(result[5], 100.0);
    }

    #[test]
    fn rsi_flat_is_100() {
        let bars = make_bars(&[1.2; 6]);
        let result = Rsi::new(3).compute(&bars);
        assert_eq!(result[3], 100.0);
    }

    #[test]
    fn rsi_all_losses() {
        let bars = make_bars(&[1.05, 1.04, 1.03, 1.02, 1.01, 1.00]);
        let result = Rsi::new(3).compute(&bars);
        assert_approx(result[3], 0.0, 1e-9);
    }

    #[test]
    fn rsi_simple_means() {
        // Changes: +0.34, -0.25, -0.48, +0.72
        // index 3 window: gains 0.34, losses 0.73 → RSI = 100 - 100/(1 + 0.34/0.73)
        // index 4 window: gains 0.72, losses 0.73 → RSI = 100 - 100/(1 + 0.72/0.73)
        let bars = make_bars(&[44.0, 44.34, 44.09, 43.61, 44.33]);
        let result = Rsi::new(3).compute(&bars);

        assert!(result[..3].iter().all(|v| v.is_nan()));
        assert_approx(result[3], 100.0 - 100.0 / (1.0 + 0.34 / 0.73), 1e-9);
        assert_approx(result[4], 100.0 - 100.0 / (1.0 + 0.72 / 0.73), 1e-9);
    }

    #[test]
    fn rsi_first_defined_at_period() {
        let closes: Vec<f64> = (0..30).map(|i| 1.1 + 0.001 * ((i % 5) as f64)).collect();
        let result = Rsi::new(14).compute(&make_bars(&closes));
        assert!(result[13].is_nan());
        assert!(!result[14].is_nan());
    }

    #[test]
    fn rsi_short_series() {
        let result = Rsi::new(14).compute(&make_bars(&[1.0, 1.1]));
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|v| v.is_nan()));
    }
}
