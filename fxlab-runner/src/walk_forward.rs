//! Walk-forward analysis: sliding calendar windows over the trade history.
//!
//! Windows are fixed-length in calendar months and advance by a fixed step.
//! Window `i` spans `[start + i·step, start + i·step + period)` where `start`
//! is the first exit time. Only windows that end on or before the last exit
//! are evaluated. Per-window metrics are computed in parallel.

use chrono::{Months, NaiveDateTime};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use fxlab_core::domain::Trade;

use crate::metrics::{mean, sample_std, MetricsRecord};

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    /// Window length in calendar months (default 12).
    pub period_months: u32,
    /// Advance between window starts in months (default 1).
    pub step_months: u32,
    pub initial_balance: f64,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            period_months: 12,
            step_months: 1,
            initial_balance: 10.0,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Metrics for the trades exiting inside one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub period: usize,
    /// Inclusive.
    pub start: NaiveDateTime,
    /// Exclusive.
    pub end: NaiveDateTime,
    pub metrics: MetricsRecord,
    /// Window net profit as a percent of the initial balance.
    pub total_return: f64,
}

/// Stability statistics across windows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardSummary {
    pub total_periods: usize,
    pub avg_trades_per_period: f64,
    pub avg_return: f64,
    /// Sample standard deviation (N - 1) of window returns.
    pub std_return: f64,
    pub avg_win_rate: f64,
    /// Mean over windows with a finite profit factor; `None` if there are none.
    pub avg_profit_factor: Option<f64>,
    pub infinite_profit_factor_periods: usize,
    pub avg_max_drawdown: f64,
    pub profitable_periods: usize,
    /// Percent of windows with positive net profit.
    pub profitable_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardReport {
    pub config: WalkForwardConfig,
    pub windows: Vec<PeriodWindow>,
    pub summary: WalkForwardSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WalkForwardOutcome {
    NoTrades,
    /// History is shorter than one window.
    NoCompleteWindow,
    Completed(WalkForwardReport),
}

impl WalkForwardOutcome {
    pub fn report(&self) -> Option<&WalkForwardReport> {
        match self {
            WalkForwardOutcome::Completed(r) => Some(r),
            _ => None,
        }
    }
}

// ─── Window generation ───────────────────────────────────────────────

/// Half-open window bounds `(index, start, end)` that fit inside `[first, last]`.
///
/// Starts are offset from `first` directly so month-end clamping never accumulates.
pub fn window_bounds(
    first: NaiveDateTime,
    last: NaiveDateTime,
    period_months: u32,
    step_months: u32,
) -> Vec<(usize, NaiveDateTime, NaiveDateTime)> {
    let mut bounds = Vec::new();
    if period_months == 0 || step_months == 0 {
        return bounds;
    }
    for i in 0u32.. {
        let Some(offset) = i.checked_mul(step_months) else {
            break;
        };
        let Some(start) = first.checked_add_months(Months::new(offset)) else {
            break;
        };
        let Some(end) = start.checked_add_months(Months::new(period_months)) else {
            break;
        };
        if end > last {
            break;
        }
        bounds.push((i as usize, start, end));
    }
    bounds
}

// ─── Analysis ────────────────────────────────────────────────────────

pub fn run_walk_forward(trades: &[Trade], config: &WalkForwardConfig) -> WalkForwardOutcome {
    if trades.is_empty() {
        info!("walk-forward skipped: no trades");
        return WalkForwardOutcome::NoTrades;
    }
    if config.period_months == 0 || config.step_months == 0 {
        warn!(
            period = config.period_months,
            step = config.step_months,
            "walk-forward period and step must be positive"
        );
        return WalkForwardOutcome::NoCompleteWindow;
    }

    let mut sorted: Vec<&Trade> = trades.iter().collect();
    sorted.sort_by_key(|t| t.exit_time);
    let first = sorted[0].exit_time;
    let last = sorted[sorted.len() - 1].exit_time;

    let bounds = window_bounds(first, last, config.period_months, config.step_months);
    if bounds.is_empty() {
        info!(%first, %last, "walk-forward skipped: history shorter than one window");
        return WalkForwardOutcome::NoCompleteWindow;
    }

    let windows: Vec<PeriodWindow> = bounds
        .par_iter()
        .filter_map(|&(period, start, end)| {
            let inside: Vec<Trade> = sorted
                .iter()
                .filter(|t| t.exit_time >= start && t.exit_time < end)
                .map(|t| (*t).clone())
                .collect();
            if inside.is_empty() {
                return None;
            }
            let metrics = MetricsRecord::compute(&inside);
            let total_return = if config.initial_balance == 0.0 {
                0.0
            } else {
                metrics.net_profit * 100.0 / config.initial_balance
            };
            Some(PeriodWindow {
                period,
                start,
                end,
                metrics,
                total_return,
            })
        })
        .collect();

    if windows.is_empty() {
        return WalkForwardOutcome::NoCompleteWindow;
    }

    let summary = summarize(&windows);
    info!(
        windows = summary.total_periods,
        profitable = summary.profitable_periods,
        "walk-forward complete"
    );
    WalkForwardOutcome::Completed(WalkForwardReport {
        config: config.clone(),
        windows,
        summary,
    })
}

fn summarize(windows: &[PeriodWindow]) -> WalkForwardSummary {
    let returns: Vec<f64> = windows.iter().map(|w| w.total_return).collect();
    let trades: Vec<f64> = windows.iter().map(|w| w.metrics.total_trades as f64).collect();
    let win_rates: Vec<f64> = windows.iter().map(|w| w.metrics.win_rate).collect();
    let drawdowns: Vec<f64> = windows.iter().map(|w| w.metrics.max_drawdown).collect();
    let finite_pf: Vec<f64> = windows
        .iter()
        .filter_map(|w| w.metrics.profit_factor.finite_value())
        .collect();
    let profitable = windows.iter().filter(|w| w.metrics.net_profit > 0.0).count();

    WalkForwardSummary {
        total_periods: windows.len(),
        avg_trades_per_period: mean(&trades),
        avg_return: mean(&returns),
        std_return: sample_std(&returns),
        avg_win_rate: mean(&win_rates),
        avg_profit_factor: if finite_pf.is_empty() {
            None
        } else {
            Some(mean(&finite_pf))
        },
        infinite_profit_factor_periods: windows.len() - finite_pf.len(),
        avg_max_drawdown: mean(&drawdowns),
        profitable_periods: profitable,
        profitable_rate: profitable as f64 / windows.len() as f64 * 100.0,
    }
}
