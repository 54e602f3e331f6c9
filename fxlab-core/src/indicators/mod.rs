//! Indicator Engine: raw price series in, indicator-augmented series out.
//!
//! Every indicator is a pure function over the close series. Values are
//! computed once per symbol as `f64` series with `NaN` for warm-up, then
//! folded into [`IndicatorBar`] where warm-up becomes `None`.
//!
//! No value at bar t depends on data from bar t+1 or later.

pub mod bollinger;
pub mod ema;
pub mod rsi;
pub mod sma;

pub use bollinger::{Bollinger, BollingerBand};
pub use ema::Ema;
pub use rsi::Rsi;
pub use sma::{rolling_mean, window_stats, WindowStats};

use crate::domain::{validate_series, PriceBar};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A per-bar indicator over a full series.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_20", "rsi_14").
    fn name(&self) -> &str;

    /// Number of leading bars that produce `NaN`.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire series; output has the same length.
    fn compute(&self, bars: &[PriceBar]) -> Vec<f64>;
}

/// Periods and multipliers for the indicator set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSettings {
    pub ema_fast_span: usize,
    pub ema_slow_span: usize,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    pub rsi_period: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            ema_fast_span: 20,
            ema_slow_span: 200,
            bb_period: 20,
            bb_std_dev: 2.0,
            rsi_period: 14,
        }
    }
}

/// A price bar plus its derived indicator values. `None` means not yet defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorBar {
    #[serde(flatten)]
    pub bar: PriceBar,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
    pub rsi: Option<f64>,
    pub bb_position: Option<f64>,
}

/// Where the close sits inside the band: 0 at the lower band, 1 at the upper.
///
/// `None` if a band is undefined or the band has zero width.
pub fn bollinger_position(close: f64, upper: Option<f64>, lower: Option<f64>) -> Option<f64> {
    let (upper, lower) = (upper?, lower?);
    let width = upper - lower;
    if width > 0.0 {
        Some((close - lower) / width)
    } else {
        None
    }
}

fn defined(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

/// Compute the full indicator set for one symbol's series.
///
/// A malformed series (non-positive or non-finite price, timestamps not
/// strictly ascending) yields an empty vector.
pub fn compute_indicators(bars: &[PriceBar], settings: &IndicatorSettings) -> Vec<IndicatorBar> {
    if let Err(err) = validate_series(bars) {
        warn!(error = %err, "malformed price series; skipping indicator computation");
        return Vec::new();
    }

    let ema_fast = Ema::new(settings.ema_fast_span).compute(bars);
    let ema_slow = Ema::new(settings.ema_slow_span).compute(bars);
    let bb_middle = Bollinger::middle(settings.bb_period, settings.bb_std_dev).compute(bars);
    let bb_upper = Bollinger::upper(settings.bb_period, settings.bb_std_dev).compute(bars);
    let bb_lower = Bollinger::lower(settings.bb_period, settings.bb_std_dev).compute(bars);
    let rsi = Rsi::new(settings.rsi_period).compute(bars);

    debug!(bars = bars.len(), ?settings, "computed indicators");

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let upper = defined(bb_upper[i]);
            let lower = defined(bb_lower[i]);
            IndicatorBar {
                bar: bar.clone(),
                ema_fast: defined(ema_fast[i]),
                ema_slow: defined(ema_slow[i]),
                bb_middle: defined(bb_middle[i]),
                bb_upper: upper,
                bb_lower: lower,
                rsi: defined(rsi[i]),
                bb_position: bollinger_position(bar.close, upper, lower),
            }
        })
        .collect()
}

/// Create hourly synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high/low = max/min ± 0.0005.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            PriceBar {
                symbol: "TEST".to_string(),
                timestamp: base + chrono::Duration::hours(i as i64),
                open,
                high: open.max(close) + 0.0005,
                low: open.min(close) - 0.0005,
                close,
                volume: None,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
