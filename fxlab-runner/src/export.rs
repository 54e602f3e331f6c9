//! Reporting and export: CSV tables, the JSON report, and a Markdown summary.
//!
//! `backtest.json` carries a `schema_version`; newer versions are rejected on
//! load so an old binary never misreads a report it does not understand.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::calendar::PeriodPerformance;
use crate::equity::EquityPoint;
use crate::monte_carlo::MonteCarloOutcome;
use crate::runner::{BacktestReport, SCHEMA_VERSION};
use crate::walk_forward::WalkForwardOutcome;
use fxlab_core::domain::{Direction, ExitReason, Trade};

pub const REPORT_FILE: &str = "backtest.json";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported schema version {found} (max supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },

    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ─── JSON ────────────────────────────────────────────────────────────

pub fn export_json(report: &BacktestReport) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Deserialize a report, rejecting schema versions newer than this build.
pub fn import_json(json: &str) -> Result<BacktestReport, ExportError> {
    let report: BacktestReport = serde_json::from_str(json)?;
    if report.schema_version > SCHEMA_VERSION {
        return Err(ExportError::UnsupportedSchema {
            found: report.schema_version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(report)
}

/// Load `backtest.json` from an output directory.
pub fn read_report(dir: &Path) -> Result<BacktestReport, ExportError> {
    let path = dir.join(REPORT_FILE);
    let json = std::fs::read_to_string(&path).map_err(io_error(&path))?;
    import_json(&json)
}

// ─── CSV ─────────────────────────────────────────────────────────────

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8(data)?)
}

pub fn trades_csv(trades: &[Trade]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "direction",
        "entry_bar",
        "entry_time",
        "entry_price",
        "exit_bar",
        "exit_time",
        "exit_price",
        "exit_reason",
        "lot_size",
        "stop_loss",
        "take_profit",
        "pnl",
        "duration_secs",
    ])?;
    for t in trades {
        wtr.write_record([
            t.symbol.clone(),
            match t.direction {
                Direction::Long => "long",
                Direction::Short => "short",
            }
            .to_string(),
            t.entry_bar.to_string(),
            t.entry_time.to_string(),
            format!("{:.6}", t.entry_price),
            t.exit_bar.to_string(),
            t.exit_time.to_string(),
            format!("{:.6}", t.exit_price),
            match t.exit_reason {
                ExitReason::StopLoss => "stop_loss",
                ExitReason::TakeProfit => "take_profit",
            }
            .to_string(),
            format!("{:.2}", t.lot_size),
            format!("{:.6}", t.stop_loss),
            format!("{:.6}", t.take_profit),
            format!("{:.4}", t.pnl),
            t.duration_secs.to_string(),
        ])?;
    }
    finish(wtr)
}

pub fn equity_csv(curve: &[EquityPoint]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "symbol",
        "trade_pnl",
        "balance",
        "cumulative_return_pct",
        "drawdown",
        "drawdown_pct",
    ])?;
    for p in curve {
        wtr.write_record([
            p.timestamp.to_string(),
            p.symbol.clone(),
            format!("{:.4}", p.trade_pnl),
            format!("{:.4}", p.balance),
            format!("{:.4}", p.cumulative_return_pct),
            format!("{:.4}", p.drawdown),
            format!("{:.4}", p.drawdown_pct),
        ])?;
    }
    finish(wtr)
}

/// Daily or monthly table; the first column is named by `period_label`.
pub fn periods_csv(periods: &[PeriodPerformance], period_label: &str) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        period_label,
        "pnl",
        "trades",
        "avg_trade_pnl",
        "symbols",
        "cumulative_pnl",
        "return_pct",
        "cumulative_return_pct",
        "winning",
    ])?;
    for p in periods {
        wtr.write_record([
            p.period.clone(),
            format!("{:.4}", p.pnl),
            p.trades.to_string(),
            format!("{:.4}", p.avg_trade_pnl),
            p.symbols.to_string(),
            format!("{:.4}", p.cumulative_pnl),
            format!("{:.4}", p.return_pct),
            format!("{:.4}", p.cumulative_return_pct),
            p.winning.to_string(),
        ])?;
    }
    finish(wtr)
}

/// One row per trial. Header only when the bootstrap did not run.
pub fn monte_carlo_csv(outcome: Option<&MonteCarloOutcome>) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "run",
        "seed",
        "final_balance",
        "total_return",
        "win_rate",
        "max_drawdown",
        "net_profit",
    ])?;
    if let Some(report) = outcome.and_then(MonteCarloOutcome::report) {
        for r in &report.runs {
            wtr.write_record([
                r.run.to_string(),
                r.seed.map(|s| s.to_string()).unwrap_or_default(),
                format!("{:.4}", r.final_balance),
                format!("{:.4}", r.total_return),
                format!("{:.2}", r.win_rate),
                format!("{:.4}", r.max_drawdown),
                format!("{:.4}", r.net_profit),
            ])?;
        }
    }
    finish(wtr)
}

/// One row per window. Header only when no window completed.
pub fn walk_forward_csv(outcome: Option<&WalkForwardOutcome>) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "period",
        "start",
        "end",
        "total_trades",
        "winning_trades",
        "win_rate",
        "net_profit",
        "profit_factor",
        "sharpe_ratio",
        "max_drawdown",
        "expectancy",
        "total_return",
    ])?;
    if let Some(report) = outcome.and_then(WalkForwardOutcome::report) {
        for w in &report.windows {
            let m = &w.metrics;
            wtr.write_record([
                w.period.to_string(),
                w.start.to_string(),
                w.end.to_string(),
                m.total_trades.to_string(),
                m.winning_trades.to_string(),
                format!("{:.2}", m.win_rate),
                format!("{:.4}", m.net_profit),
                m.profit_factor.to_string(),
                format!("{:.4}", m.sharpe_ratio),
                format!("{:.4}", m.max_drawdown),
                format!("{:.4}", m.expectancy),
                format!("{:.4}", w.total_return),
            ])?;
        }
    }
    finish(wtr)
}

// ─── Markdown ────────────────────────────────────────────────────────

/// Human-readable summary of a run.
pub fn summary_markdown(report: &BacktestReport) -> String {
    let mut md = String::with_capacity(4096);
    let m = &report.metrics;
    let eq = &report.equity_summary;

    md.push_str("# FXLab Backtest Summary\n\n");

    md.push_str("## Run\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Pairs | {} |\n",
        report
            .symbols
            .iter()
            .map(|s| s.symbol.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    md.push_str(&format!("| Initial Balance | ${:.2} |\n", report.config.initial_balance));
    md.push_str(&format!("| Final Balance | ${:.2} |\n", report.final_balance()));
    md.push_str(&format!("| Config Hash | {} |\n", report.config_hash));
    md.push_str(&format!("| Dataset Hash | {} |\n", report.dataset_hash));
    if report.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Performance\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Trades | {} |\n", m.total_trades));
    md.push_str(&format!(
        "| Wins / Losses | {} / {} |\n",
        m.winning_trades, m.losing_trades
    ));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate));
    md.push_str(&format!("| Net Profit | ${:.2} |\n", m.net_profit));
    md.push_str(&format!("| Total Return | {:.2}% |\n", eq.total_return_pct));
    md.push_str(&format!("| Profit Factor | {} |\n", m.profit_factor));
    md.push_str(&format!("| Sharpe | {:.3} |\n", m.sharpe_ratio));
    md.push_str(&format!(
        "| Max Drawdown | ${:.2} ({:.2}%) |\n",
        m.max_drawdown, eq.max_drawdown_pct
    ));
    md.push_str(&format!("| Expectancy | ${:.4} |\n", m.expectancy));
    md.push_str(&format!(
        "| Avg Win / Avg Loss | ${:.4} / ${:.4} |\n",
        m.avg_win, m.avg_loss
    ));
    md.push_str(&format!(
        "| Avg Trade Duration | {:.1} h |\n",
        m.avg_trade_duration_hours
    ));
    md.push('\n');

    let t = &report.targets;
    md.push_str("## Targets\n\n");
    md.push_str(&format!("Rating: **{}**\n\n", t.rating.description()));
    md.push_str("| Target | Threshold | Met |\n");
    md.push_str("| --- | ---: | --- |\n");
    md.push_str(&format!("| Day 1 | {:.1}% | {} |\n", t.targets.day1, yes_no(t.met_day1)));
    md.push_str(&format!("| Day 2 | {:.1}% | {} |\n", t.targets.day2, yes_no(t.met_day2)));
    md.push_str(&format!(
        "| Day 3+ | {:.1}% to {:.1}% | {} |\n",
        t.targets.day3_plus_min,
        t.targets.day3_plus_max,
        yes_no(t.met_day3_min)
    ));
    md.push('\n');

    if !report.symbols.is_empty() {
        md.push_str("## Pairs\n\n");
        md.push_str("| Pair | Bars | Trades | Win Rate | Net Profit | Halted Bars | Open at End |\n");
        md.push_str("| --- | ---: | ---: | ---: | ---: | ---: | --- |\n");
        for s in &report.symbols {
            let d = &s.diagnostics;
            md.push_str(&format!(
                "| {} | {} | {} | {:.1}% | ${:.2} | {} | {} |\n",
                s.symbol,
                s.bars,
                s.metrics.total_trades,
                s.metrics.win_rate,
                s.metrics.net_profit,
                d.bars_halted_daily_loss + d.bars_halted_consecutive_losses,
                yes_no(s.open_position.is_some()),
            ));
        }
        md.push('\n');
    }

    if !report.skipped_symbols.is_empty() {
        md.push_str("## Skipped Pairs\n\n");
        for s in &report.skipped_symbols {
            md.push_str(&format!("- {}: {}\n", s.symbol, s.reason));
        }
        md.push('\n');
    }

    if !report.config_warnings.is_empty() {
        md.push_str("## Configuration Fallbacks\n\n");
        for w in &report.config_warnings {
            md.push_str(&format!("- {w}\n"));
        }
        md.push('\n');
    }

    let cal = &report.calendar;
    md.push_str("## Calendar\n\n");
    md.push_str("| Period | Count | Winning | Win Rate | Avg P&L | Best | Worst |\n");
    md.push_str("| --- | ---: | ---: | ---: | ---: | ---: | ---: |\n");
    for (label, s) in [("Daily", &cal.daily_summary), ("Monthly", &cal.monthly_summary)] {
        md.push_str(&format!(
            "| {label} | {} | {} | {:.1}% | ${:.2} | ${:.2} | ${:.2} |\n",
            s.total_periods, s.winning_periods, s.win_rate, s.avg_pnl, s.best, s.worst
        ));
    }
    md.push('\n');

    match &report.monte_carlo {
        Some(MonteCarloOutcome::Completed(mc)) => {
            let ci = &mc.confidence_intervals;
            md.push_str("## Monte Carlo\n\n");
            md.push_str(&format!(
                "{} trials resampling {} trades, seed {}, {:.0}% intervals.\n\n",
                mc.runs.len(),
                mc.trade_count,
                mc.config.seed,
                mc.config.confidence_level
            ));
            md.push_str("| Metric | Mean | Std | Lower | Upper |\n");
            md.push_str("| --- | ---: | ---: | ---: | ---: |\n");
            for (label, c) in [
                ("Final Balance", &ci.final_balance),
                ("Total Return %", &ci.total_return),
                ("Win Rate %", &ci.win_rate),
                ("Max Drawdown", &ci.max_drawdown),
            ] {
                md.push_str(&format!(
                    "| {label} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
                    c.mean, c.std, c.lower, c.upper
                ));
            }
            let p = &mc.target_probabilities;
            md.push_str(&format!(
                "\nProbability of Day 1 target {:.1}%, Day 2 {:.1}%, Day 3+ minimum {:.1}%, \
                 break-even {:.1}%, loss {:.1}%.\n\n",
                p.day1 * 100.0,
                p.day2 * 100.0,
                p.day3_min * 100.0,
                p.breakeven * 100.0,
                p.loss * 100.0
            ));
        }
        Some(MonteCarloOutcome::NoTrades) => {
            md.push_str("## Monte Carlo\n\nNo trades to resample.\n\n");
        }
        None => {}
    }

    match &report.walk_forward {
        Some(WalkForwardOutcome::Completed(wf)) => {
            let s = &wf.summary;
            md.push_str("## Walk-Forward\n\n");
            md.push_str("| Metric | Value |\n");
            md.push_str("| --- | --- |\n");
            md.push_str(&format!(
                "| Windows | {} ({} months, step {}) |\n",
                s.total_periods, wf.config.period_months, wf.config.step_months
            ));
            md.push_str(&format!(
                "| Profitable Windows | {} ({:.1}%) |\n",
                s.profitable_periods, s.profitable_rate
            ));
            md.push_str(&format!(
                "| Avg Return | {:.2}% (std {:.2}) |\n",
                s.avg_return, s.std_return
            ));
            md.push_str(&format!("| Avg Win Rate | {:.1}% |\n", s.avg_win_rate));
            md.push_str(&format!(
                "| Avg Profit Factor | {} |\n",
                s.avg_profit_factor
                    .map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
            ));
            md.push_str(&format!("| Avg Trades per Window | {:.1} |\n", s.avg_trades_per_period));
            md.push('\n');
        }
        Some(WalkForwardOutcome::NoCompleteWindow) => {
            md.push_str("## Walk-Forward\n\nTrade history is shorter than one window.\n\n");
        }
        Some(WalkForwardOutcome::NoTrades) => {
            md.push_str("## Walk-Forward\n\nNo trades to analyze.\n\n");
        }
        None => {}
    }

    md
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

// ─── Artifact bundle ─────────────────────────────────────────────────

/// Write the full artifact set into `dir`, creating it if needed.
///
/// Returns the written paths in a fixed order.
pub fn write_artifacts(report: &BacktestReport, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir).map_err(io_error(dir))?;

    let files = [
        ("trades.csv", trades_csv(&report.trades)?),
        ("equity_curve.csv", equity_csv(&report.equity_curve)?),
        ("daily_performance.csv", periods_csv(&report.calendar.daily, "date")?),
        ("monthly_performance.csv", periods_csv(&report.calendar.monthly, "month")?),
        ("monte_carlo_simulation.csv", monte_carlo_csv(report.monte_carlo.as_ref())?),
        ("walk_forward_periods.csv", walk_forward_csv(report.walk_forward.as_ref())?),
        (REPORT_FILE, export_json(report)?),
        ("summary.md", summary_markdown(report)),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, contents) in files {
        let path = dir.join(name);
        std::fs::write(&path, contents).map_err(io_error(&path))?;
        written.push(path);
    }
    info!(dir = %dir.display(), files = written.len(), "artifacts written");
    Ok(written)
}
