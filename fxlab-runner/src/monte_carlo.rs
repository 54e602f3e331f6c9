//! Monte Carlo bootstrap of trade outcomes.
//!
//! Each trial resamples the realized P&L list with replacement and replays it
//! against the initial balance. Trials are independent and run in parallel;
//! every trial owns an RNG derived from the master seed and its index, so the
//! output does not depend on thread count or scheduling.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fxlab_core::rng::RngHierarchy;

use crate::metrics::{
    max_drawdown, mean, percentile_sorted, population_std, sample_std, win_rate,
};
use crate::targets::PerformanceTargets;

/// Stream name used to derive per-trial seeds.
pub const MONTE_CARLO_STREAM: &str = "monte_carlo";

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Number of resampled trials (default 1000).
    pub runs: usize,
    /// Confidence level in percent (default 95).
    pub confidence_level: f64,
    pub initial_balance: f64,
    /// Master seed for the per-trial RNG hierarchy (default 42).
    pub seed: u64,
    pub targets: PerformanceTargets,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            runs: 1000,
            confidence_level: 95.0,
            initial_balance: 10.0,
            seed: 42,
            targets: PerformanceTargets::default(),
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// One resampled trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
    pub run: usize,
    /// Derived seed, when the trial RNG came from the built-in hierarchy.
    pub seed: Option<u64>,
    pub final_balance: f64,
    /// Percent return on the initial balance.
    pub total_return: f64,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub net_profit: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub mean: f64,
    /// Population standard deviation across trials.
    pub std: f64,
}

impl ConfidenceInterval {
    /// Percentile interval at `confidence_level` percent over unsorted values.
    pub fn from_values(values: &[f64], confidence_level: f64) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let tail = (100.0 - confidence_level) / 2.0;
        Self {
            lower: percentile_sorted(&sorted, tail),
            upper: percentile_sorted(&sorted, 100.0 - tail),
            mean: mean(values),
            std: population_std(values),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceIntervals {
    pub final_balance: ConfidenceInterval,
    pub total_return: ConfidenceInterval,
    pub win_rate: ConfidenceInterval,
    pub max_drawdown: ConfidenceInterval,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub mean_final_balance: f64,
    /// Sample standard deviation (N - 1), as are the other summary spreads.
    pub std_final_balance: f64,
    pub mean_total_return: f64,
    pub std_total_return: f64,
    pub mean_win_rate: f64,
    pub mean_max_drawdown: f64,
    pub worst_return: f64,
    pub best_return: f64,
}

/// Fraction of trials (0..=1) reaching each threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetProbabilities {
    pub day1: f64,
    pub day2: f64,
    pub day3_min: f64,
    /// Return ≥ 0.
    pub breakeven: f64,
    /// Return < 0.
    pub loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloReport {
    pub config: MonteCarloConfig,
    /// Size of the P&L pool each trial resamples.
    pub trade_count: usize,
    pub runs: Vec<SimulationRun>,
    pub summary: SummaryStatistics,
    pub confidence_intervals: ConfidenceIntervals,
    pub target_probabilities: TargetProbabilities,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MonteCarloOutcome {
    /// Nothing to resample.
    NoTrades,
    Completed(MonteCarloReport),
}

impl MonteCarloOutcome {
    pub fn report(&self) -> Option<&MonteCarloReport> {
        match self {
            MonteCarloOutcome::Completed(r) => Some(r),
            MonteCarloOutcome::NoTrades => None,
        }
    }
}

// ─── Simulation ──────────────────────────────────────────────────────

/// Run the bootstrap with per-trial RNGs from the BLAKE3 seed hierarchy.
pub fn run_monte_carlo(pnls: &[f64], config: &MonteCarloConfig) -> MonteCarloOutcome {
    let hierarchy = RngHierarchy::new(config.seed);
    run_trials(pnls, config, |run| {
        let seed = hierarchy.sub_seed(MONTE_CARLO_STREAM, run as u64);
        (Some(seed), hierarchy.rng_for(MONTE_CARLO_STREAM, run as u64))
    })
}

/// Run the bootstrap with caller-supplied per-trial RNGs.
///
/// `rng_for(run)` is called once per trial, possibly from several threads.
pub fn run_monte_carlo_with<F, R>(
    pnls: &[f64],
    config: &MonteCarloConfig,
    rng_for: F,
) -> MonteCarloOutcome
where
    F: Fn(usize) -> R + Sync,
    R: Rng,
{
    run_trials(pnls, config, |run| (None, rng_for(run)))
}

fn run_trials<F, R>(pnls: &[f64], config: &MonteCarloConfig, make_rng: F) -> MonteCarloOutcome
where
    F: Fn(usize) -> (Option<u64>, R) + Sync,
    R: Rng,
{
    if pnls.is_empty() {
        info!("monte carlo skipped: no trades to resample");
        return MonteCarloOutcome::NoTrades;
    }

    info!(
        runs = config.runs,
        trades = pnls.len(),
        seed = config.seed,
        "running monte carlo"
    );

    let runs: Vec<SimulationRun> = (0..config.runs)
        .into_par_iter()
        .map(|run| {
            let (seed, mut rng) = make_rng(run);
            simulate_trial(run, seed, pnls, config.initial_balance, &mut rng)
        })
        .collect();

    let report = summarize(pnls.len(), runs, config);
    debug!(
        mean_return = report.summary.mean_total_return,
        p_loss = report.target_probabilities.loss,
        "monte carlo complete"
    );
    MonteCarloOutcome::Completed(report)
}

/// One bootstrap trial: `pnls.len()` independent uniform draws with replacement.
fn simulate_trial<R: Rng>(
    run: usize,
    seed: Option<u64>,
    pnls: &[f64],
    initial_balance: f64,
    rng: &mut R,
) -> SimulationRun {
    let n = pnls.len();
    let sample: Vec<f64> = (0..n).map(|_| pnls[rng.gen_range(0..n)]).collect();
    let net_profit: f64 = sample.iter().sum();
    let final_balance = initial_balance + net_profit;
    let total_return = if initial_balance == 0.0 {
        0.0
    } else {
        (final_balance / initial_balance - 1.0) * 100.0
    };
    SimulationRun {
        run,
        seed,
        final_balance,
        total_return,
        win_rate: win_rate(&sample),
        max_drawdown: max_drawdown(&sample),
        net_profit,
    }
}

fn summarize(
    trade_count: usize,
    runs: Vec<SimulationRun>,
    config: &MonteCarloConfig,
) -> MonteCarloReport {
    let finals: Vec<f64> = runs.iter().map(|r| r.final_balance).collect();
    let returns: Vec<f64> = runs.iter().map(|r| r.total_return).collect();
    let win_rates: Vec<f64> = runs.iter().map(|r| r.win_rate).collect();
    let drawdowns: Vec<f64> = runs.iter().map(|r| r.max_drawdown).collect();

    let summary = SummaryStatistics {
        mean_final_balance: mean(&finals),
        std_final_balance: sample_std(&finals),
        mean_total_return: mean(&returns),
        std_total_return: sample_std(&returns),
        mean_win_rate: mean(&win_rates),
        mean_max_drawdown: mean(&drawdowns),
        worst_return: returns.iter().copied().fold(f64::INFINITY, f64::min),
        best_return: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    };

    let c = config.confidence_level;
    let confidence_intervals = ConfidenceIntervals {
        final_balance: ConfidenceInterval::from_values(&finals, c),
        total_return: ConfidenceInterval::from_values(&returns, c),
        win_rate: ConfidenceInterval::from_values(&win_rates, c),
        max_drawdown: ConfidenceInterval::from_values(&drawdowns, c),
    };

    let fraction = |pred: &dyn Fn(f64) -> bool| {
        if returns.is_empty() {
            0.0
        } else {
            returns.iter().filter(|r| pred(**r)).count() as f64 / returns.len() as f64
        }
    };
    let t = &config.targets;
    let target_probabilities = TargetProbabilities {
        day1: fraction(&|r: f64| r >= t.day1),
        day2: fraction(&|r: f64| r >= t.day2),
        day3_min: fraction(&|r: f64| r >= t.day3_plus_min),
        breakeven: fraction(&|r: f64| r >= 0.0),
        loss: fraction(&|r: f64| r < 0.0),
    };

    MonteCarloReport {
        config: config.clone(),
        trade_count,
        runs,
        summary,
        confidence_intervals,
        target_probabilities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(runs: usize) -> MonteCarloConfig {
        MonteCarloConfig {
            runs,
            initial_balance: 1_000.0,
            ..MonteCarloConfig::default()
        }
    }

    #[test]
    fn singleton_pool_collapses() {
        let outcome = run_monte_carlo(&[100.0], &config(200));
        let report = outcome.report().unwrap();
        assert_eq!(report.runs.len(), 200);
        for run in &report.runs {
            assert_eq!(run.final_balance, 1_100.0);
            assert_eq!(run.win_rate, 100.0);
        }
        let ci = report.confidence_intervals.final_balance;
        assert_eq!(ci.lower, 1_100.0);
        assert_eq!(ci.upper, 1_100.0);
        assert_eq!(ci.std, 0.0);
        assert_eq!(report.target_probabilities.breakeven, 1.0);
        assert_eq!(report.target_probabilities.loss, 0.0);
    }

    #[test]
    fn empty_pool_is_explicit() {
        assert_eq!(run_monte_carlo(&[], &config(10)), MonteCarloOutcome::NoTrades);
    }

    #[test]
    fn same_seed_same_runs() {
        let pnls = [5.0, -3.0, 2.0, -1.0, 4.0];
        let a = run_monte_carlo(&pnls, &config(64));
        let b = run_monte_carlo(&pnls, &config(64));
        assert_eq!(a, b);

        let other = MonteCarloConfig {
            seed: 7,
            ..config(64)
        };
        assert_ne!(a, run_monte_carlo(&pnls, &other));
    }

    #[test]
    fn injected_rng_is_used() {
        let pnls = [5.0, -3.0];
        let a = run_monte_carlo_with(&pnls, &config(16), |run| StdRng::seed_from_u64(run as u64));
        let b = run_monte_carlo_with(&pnls, &config(16), |run| StdRng::seed_from_u64(run as u64));
        assert_eq!(a, b);
        let report = a.report().unwrap();
        assert!(report.runs.iter().all(|r| r.seed.is_none()));
        for r in &report.runs {
            let p = &report.target_probabilities;
            assert!((p.breakeven + p.loss - 1.0).abs() < 1e-12);
            assert!(r.net_profit >= -6.0 && r.net_profit <= 10.0);
        }
    }

    #[test]
    fn summary_std_is_sample_while_interval_std_is_population() {
        let report = run_monte_carlo(&[10.0, -10.0, 4.0], &config(50));
        let report = report.report().unwrap();
        let returns: Vec<f64> = report.runs.iter().map(|r| r.total_return).collect();
        let n = returns.len() as f64;
        let m = returns.iter().sum::<f64>() / n;
        let ss = returns.iter().map(|r| (r - m).powi(2)).sum::<f64>();

        assert!((report.summary.std_total_return - (ss / (n - 1.0)).sqrt()).abs() < 1e-9);
        let ci = report.confidence_intervals.total_return;
        assert!((ci.std - (ss / n).sqrt()).abs() < 1e-9);
        assert!(report.summary.std_total_return > ci.std);
    }

    #[test]
    fn confidence_interval_bounds() {
        let values: Vec<f64> = (0..=100).map(f64::from).collect();
        let ci = ConfidenceInterval::from_values(&values, 95.0);
        assert!((ci.lower - 2.5).abs() < 1e-9);
        assert!((ci.upper - 97.5).abs() < 1e-9);
        assert!((ci.mean - 50.0).abs() < 1e-9);
    }
}
