//! Performance metrics: pure functions that reduce a trade sequence to statistics.
//!
//! Every metric is derived from the P&L list it is given, in the order given.
//! Nothing here stores state or depends on the simulator.

use std::fmt;

use fxlab_core::domain::Trade;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Trading days per year used to annualize the per-trade Sharpe ratio.
pub const ANNUALIZATION_DAYS: f64 = 252.0;

/// Gross profit over gross loss, with the no-loss case kept explicit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfitFactor {
    Finite(f64),
    /// Gross loss is zero while gross profit is positive.
    Infinite,
}

impl ProfitFactor {
    pub fn from_gross(gross_profit: f64, gross_loss: f64) -> Self {
        if gross_loss > 0.0 {
            ProfitFactor::Finite(gross_profit / gross_loss)
        } else if gross_profit > 0.0 {
            ProfitFactor::Infinite
        } else {
            ProfitFactor::Finite(0.0)
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, ProfitFactor::Finite(_))
    }

    pub fn finite_value(&self) -> Option<f64> {
        match self {
            ProfitFactor::Finite(v) => Some(*v),
            ProfitFactor::Infinite => None,
        }
    }

    /// Numeric value, `f64::INFINITY` for the infinite case.
    pub fn as_f64(&self) -> f64 {
        self.finite_value().unwrap_or(f64::INFINITY)
    }
}

impl Default for ProfitFactor {
    fn default() -> Self {
        ProfitFactor::Finite(0.0)
    }
}

impl fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfitFactor::Finite(v) => write!(f, "{v:.2}"),
            ProfitFactor::Infinite => f.write_str("inf"),
        }
    }
}

impl Serialize for ProfitFactor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ProfitFactor::Finite(v) => serializer.serialize_f64(*v),
            ProfitFactor::Infinite => serializer.serialize_str("inf"),
        }
    }
}

impl<'de> Deserialize<'de> for ProfitFactor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(ProfitFactor::Finite(v)),
            Repr::Text(s) if s.eq_ignore_ascii_case("inf") => Ok(ProfitFactor::Infinite),
            Repr::Text(s) => Err(serde::de::Error::custom(format!(
                "invalid profit factor {s:?}, expected a number or \"inf\""
            ))),
        }
    }
}

/// Aggregate statistics for a trade sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percent of trades with positive P&L.
    pub win_rate: f64,
    pub gross_profit: f64,
    /// Absolute sum of losing P&L.
    pub gross_loss: f64,
    pub net_profit: f64,
    pub profit_factor: ProfitFactor,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough fall of cumulative P&L, as a non-negative amount.
    pub max_drawdown: f64,
    pub expectancy: f64,
    pub avg_win: f64,
    /// Mean losing P&L as a positive amount.
    pub avg_loss: f64,
    pub largest_win: f64,
    /// Most negative single P&L (0 when there are no losers).
    pub largest_loss: f64,
    pub avg_trade_duration_hours: f64,
}

impl MetricsRecord {
    /// Compute all metrics from closed trades, in the order given.
    pub fn compute(trades: &[Trade]) -> Self {
        let pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
        let mut record = Self::from_pnls(&pnls);
        if !trades.is_empty() {
            let total_secs: i64 = trades.iter().map(|t| t.duration_secs).sum();
            record.avg_trade_duration_hours = total_secs as f64 / 3600.0 / trades.len() as f64;
        }
        record
    }

    /// Compute metrics from a bare P&L list. Empty input gives an all-zero record.
    pub fn from_pnls(pnls: &[f64]) -> Self {
        if pnls.is_empty() {
            return Self::default();
        }

        let wins: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = pnls.iter().copied().filter(|p| *p < 0.0).collect();

        let gross_profit: f64 = wins.iter().sum();
        let gross_loss: f64 = -losses.iter().sum::<f64>();
        let win_rate = win_rate(pnls);
        let avg_win = mean(&wins);
        let avg_loss = -mean(&losses);

        Self {
            total_trades: pnls.len(),
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate,
            gross_profit,
            gross_loss,
            net_profit: pnls.iter().sum(),
            profit_factor: ProfitFactor::from_gross(gross_profit, gross_loss),
            sharpe_ratio: sharpe_ratio(pnls),
            max_drawdown: max_drawdown(pnls),
            expectancy: win_rate / 100.0 * avg_win - (100.0 - win_rate) / 100.0 * avg_loss,
            avg_win,
            avg_loss,
            largest_win: wins.iter().copied().fold(0.0, f64::max),
            largest_loss: losses.iter().copied().fold(0.0, f64::min),
            avg_trade_duration_hours: 0.0,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Percent of P&L values strictly above zero. 0 for empty input.
pub fn win_rate(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    pnls.iter().filter(|p| **p > 0.0).count() as f64 / pnls.len() as f64 * 100.0
}

/// Per-trade Sharpe: mean / population std × √252.
///
/// Returns 0.0 for fewer than 2 values or zero variance.
pub fn sharpe_ratio(pnls: &[f64]) -> f64 {
    if pnls.len() < 2 {
        return 0.0;
    }
    let std = population_std(pnls);
    if std < 1e-15 {
        return 0.0;
    }
    mean(pnls) / std * ANNUALIZATION_DAYS.sqrt()
}

/// Largest drop of cumulative P&L below its running peak.
///
/// The peak starts at the first cumulative value, not at zero.
pub fn max_drawdown(pnls: &[f64]) -> f64 {
    let mut cumulative = 0.0;
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd: f64 = 0.0;
    for pnl in pnls {
        cumulative += pnl;
        peak = peak.max(cumulative);
        max_dd = max_dd.max(peak - cumulative);
    }
    max_dd
}

// ─── Shared statistics helpers ──────────────────────────────────────

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation dividing by N.
pub(crate) fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Standard deviation dividing by N - 1; 0 for fewer than 2 values.
pub(crate) fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Linear-interpolated percentile of an ascending slice (`p` in 0..=100).
pub(crate) fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNLS: [f64; 10] = [50.0, -20.0, 30.0, -10.0, 40.0, -15.0, 25.0, -5.0, 60.0, -30.0];

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {b}, got {a}");
    }

    #[test]
    fn ten_trade_reference() {
        let m = MetricsRecord::from_pnls(&PNLS);
        assert_eq!(m.total_trades, 10);
        assert_eq!(m.winning_trades, 5);
        assert_eq!(m.losing_trades, 5);
        approx(m.win_rate, 50.0);
        approx(m.net_profit, 125.0);
        approx(m.gross_profit, 205.0);
        approx(m.gross_loss, 80.0);
        assert_eq!(m.profit_factor, ProfitFactor::Finite(205.0 / 80.0));
        approx(m.avg_win, 41.0);
        approx(m.avg_loss, 16.0);
        approx(m.expectancy, 12.5);
        approx(m.max_drawdown, 30.0);
        approx(m.largest_win, 60.0);
        approx(m.largest_loss, -30.0);
    }

    #[test]
    fn sharpe_uses_population_std() {
        let m = MetricsRecord::from_pnls(&PNLS);
        let expected = mean(&PNLS) / population_std(&PNLS) * 252f64.sqrt();
        approx(m.sharpe_ratio, expected);
    }

    #[test]
    fn empty_is_all_zero() {
        let m = MetricsRecord::from_pnls(&[]);
        assert_eq!(m, MetricsRecord::default());
        assert_eq!(MetricsRecord::compute(&[]), MetricsRecord::default());
    }

    #[test]
    fn single_trade_has_no_sharpe() {
        let m = MetricsRecord::from_pnls(&[100.0]);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.profit_factor, ProfitFactor::Infinite);
        assert_eq!(m.max_drawdown, 0.0);
    }

    #[test]
    fn break_even_is_neither_win_nor_loss() {
        let m = MetricsRecord::from_pnls(&[0.0, 0.0, 10.0]);
        assert_eq!(m.winning_trades, 1);
        assert_eq!(m.losing_trades, 0);
        approx(m.win_rate, 100.0 / 3.0);
    }

    #[test]
    fn profit_factor_cases() {
        assert_eq!(ProfitFactor::from_gross(0.0, 0.0), ProfitFactor::Finite(0.0));
        assert_eq!(ProfitFactor::from_gross(5.0, 0.0), ProfitFactor::Infinite);
        assert_eq!(ProfitFactor::from_gross(6.0, 3.0), ProfitFactor::Finite(2.0));
        assert_eq!(ProfitFactor::Infinite.to_string(), "inf");
        assert_eq!(ProfitFactor::Finite(2.5).to_string(), "2.50");
    }

    #[test]
    fn profit_factor_serde() {
        assert_eq!(serde_json::to_string(&ProfitFactor::Infinite).unwrap(), "\"inf\"");
        assert_eq!(serde_json::to_string(&ProfitFactor::Finite(1.5)).unwrap(), "1.5");
        let inf: ProfitFactor = serde_json::from_str("\"inf\"").unwrap();
        assert_eq!(inf, ProfitFactor::Infinite);
        let fin: ProfitFactor = serde_json::from_str("2.0").unwrap();
        assert_eq!(fin, ProfitFactor::Finite(2.0));
        assert!(serde_json::from_str::<ProfitFactor>("\"nope\"").is_err());
    }

    #[test]
    fn drawdown_peak_starts_at_first_value() {
        // Loss first: cumulative -10, -30 → drawdown measured from -10.
        approx(max_drawdown(&[-10.0, -20.0]), 20.0);
        approx(max_drawdown(&[10.0, 20.0, 30.0]), 0.0);
    }

    #[test]
    fn percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        approx(percentile_sorted(&sorted, 50.0), 3.0);
        approx(percentile_sorted(&sorted, 25.0), 2.0);
        approx(percentile_sorted(&sorted, 2.5), 1.1);
        approx(percentile_sorted(&[7.0], 97.5), 7.0);
    }

    #[test]
    fn std_variants() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        approx(population_std(&v), 2.0);
        approx(sample_std(&v), (32.0f64 / 7.0).sqrt());
        assert_eq!(sample_std(&[1.0]), 0.0);
    }
}
