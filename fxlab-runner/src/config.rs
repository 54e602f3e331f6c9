//! Backtest configuration loaded from a flat parameter file.
//!
//! The file is read as TOML when it parses (section headers are flattened
//! away), otherwise as `KEY = value` lines. Keys are case-insensitive. A value
//! that is missing or unusable falls back to its default and is reported as a
//! [`ConfigWarning`]; loading never fails.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use fxlab_core::engine::{GateScope, RiskConfig, StrategyConfig};
use fxlab_core::indicators::IndicatorSettings;
use fxlab_core::signals::SignalThresholds;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::monte_carlo::MonteCarloConfig;
use crate::targets::PerformanceTargets;
use crate::walk_forward::WalkForwardConfig;

/// Everything a backtest run needs, with defaults for every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub initial_balance: f64,
    pub trading_pairs: Vec<String>,
    pub risk: RiskConfig,
    pub indicators: IndicatorSettings,
    pub thresholds: SignalThresholds,
    pub monte_carlo_runs: usize,
    pub monte_carlo_confidence_level: f64,
    pub monte_carlo_seed: u64,
    pub walk_forward_period_months: u32,
    pub walk_forward_step_months: u32,
    pub targets: PerformanceTargets,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_balance: 10.0,
            trading_pairs: ["EURUSD", "USDJPY", "GBPUSD", "AUDUSD"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            risk: RiskConfig::default(),
            indicators: IndicatorSettings::default(),
            thresholds: SignalThresholds::default(),
            monte_carlo_runs: 1000,
            monte_carlo_confidence_level: 95.0,
            monte_carlo_seed: 42,
            walk_forward_period_months: 12,
            walk_forward_step_months: 1,
            targets: PerformanceTargets::default(),
        }
    }
}

// ─── Warnings ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    MissingFile,
    UnreadableFile,
    MissingKey,
    InvalidValue,
}

/// A setting that fell back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub kind: WarningKind,
    pub key: Option<String>,
    pub message: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{key}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

// ─── Loading ─────────────────────────────────────────────────────────

impl BacktestConfig {
    /// Load from `path`. A missing or unreadable file yields full defaults.
    pub fn load(path: &Path) -> (Self, Vec<ConfigWarning>) {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(err) => {
                let kind = if err.kind() == std::io::ErrorKind::NotFound {
                    WarningKind::MissingFile
                } else {
                    WarningKind::UnreadableFile
                };
                let warning = ConfigWarning {
                    kind,
                    key: None,
                    message: format!("{}: {err}; using defaults", path.display()),
                };
                warn!(%warning, "config file not loaded");
                (Self::default(), vec![warning])
            }
        }
    }

    /// Parse file contents (TOML or `KEY = value` lines).
    pub fn parse(text: &str) -> (Self, Vec<ConfigWarning>) {
        let values = match text.parse::<toml::Table>() {
            Ok(table) => {
                let mut flat = BTreeMap::new();
                flatten_toml(&table, &mut flat);
                flat
            }
            Err(err) => {
                debug!(error = %err, "not TOML; reading as KEY = value lines");
                parse_lines(text)
            }
        };
        let mut raw = RawValues {
            values,
            warnings: Vec::new(),
        };
        let config = Self::from_raw(&mut raw);
        (config, raw.warnings)
    }

    fn from_raw(raw: &mut RawValues) -> Self {
        let d = Self::default();
        let positive = |v: &f64| *v > 0.0;

        let risk = RiskConfig {
            risk_per_trade_pct: raw.float(&["risk_per_trade"], d.risk.risk_per_trade_pct, positive),
            daily_loss_limit_pct: raw.float(&["daily_loss_limit"], d.risk.daily_loss_limit_pct, positive),
            stop_loss_pips: raw.float(&["stop_loss_pips"], d.risk.stop_loss_pips, positive),
            take_profit_pips: raw.float(&["take_profit_pips"], d.risk.take_profit_pips, positive),
            max_consecutive_losses: raw.count(
                &["max_consecutive_losses"],
                d.risk.max_consecutive_losses as u64,
                1,
                u32::MAX as u64,
            ) as u32,
            gate_scope: raw.gate_scope(&["gate_scope"], d.risk.gate_scope),
        };

        let indicators = IndicatorSettings {
            ema_fast_span: raw.count(&["ema_fast_span"], d.indicators.ema_fast_span as u64, 1, 100_000)
                as usize,
            ema_slow_span: raw.count(&["ema_slow_span"], d.indicators.ema_slow_span as u64, 1, 100_000)
                as usize,
            bb_period: raw.count(&["bb_period"], d.indicators.bb_period as u64, 1, 100_000) as usize,
            bb_std_dev: raw.float(&["bb_std_dev"], d.indicators.bb_std_dev, |v| *v >= 0.0),
            rsi_period: raw.count(&["rsi_period"], d.indicators.rsi_period as u64, 1, 100_000) as usize,
        };

        let targets = PerformanceTargets {
            day1: raw.float(&["day_1_target"], d.targets.day1, |_| true),
            day2: raw.float(&["day_2_target"], d.targets.day2, |_| true),
            day3_plus_min: raw.float(&["day_3_plus_target_min"], d.targets.day3_plus_min, |_| true),
            day3_plus_max: raw.float(&["day_3_plus_target_max"], d.targets.day3_plus_max, |_| true),
        };

        Self {
            initial_balance: raw.float(
                &["backtest_initial_balance", "initial_balance"],
                d.initial_balance,
                positive,
            ),
            trading_pairs: raw.symbols(&["trading_pairs"], d.trading_pairs),
            risk,
            indicators,
            thresholds: d.thresholds,
            monte_carlo_runs: raw.count(&["monte_carlo_runs"], d.monte_carlo_runs as u64, 1, 10_000_000)
                as usize,
            monte_carlo_confidence_level: raw.float(
                &["monte_carlo_confidence_level"],
                d.monte_carlo_confidence_level,
                |v| *v > 0.0 && *v < 100.0,
            ),
            monte_carlo_seed: raw.count(&["monte_carlo_seed"], d.monte_carlo_seed, 0, u64::MAX),
            walk_forward_period_months: raw.count(
                &["walk_forward_period_months"],
                d.walk_forward_period_months as u64,
                1,
                1_200,
            ) as u32,
            walk_forward_step_months: raw.count(
                &["walk_forward_step_months"],
                d.walk_forward_step_months as u64,
                1,
                1_200,
            ) as u32,
            targets,
        }
    }

    // ─── Derived settings ────────────────────────────────────────────

    pub fn strategy(&self) -> StrategyConfig {
        StrategyConfig {
            indicators: self.indicators.clone(),
            thresholds: self.thresholds.clone(),
            risk: self.risk.clone(),
        }
    }

    pub fn monte_carlo(&self) -> MonteCarloConfig {
        MonteCarloConfig {
            runs: self.monte_carlo_runs,
            confidence_level: self.monte_carlo_confidence_level,
            initial_balance: self.initial_balance,
            seed: self.monte_carlo_seed,
            targets: self.targets.clone(),
        }
    }

    pub fn walk_forward(&self) -> WalkForwardConfig {
        WalkForwardConfig {
            period_months: self.walk_forward_period_months,
            step_months: self.walk_forward_step_months,
            initial_balance: self.initial_balance,
        }
    }

    /// Content hash of the effective configuration (BLAKE3, hex).
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }

    /// Render as a parameter file that [`BacktestConfig::parse`] reads back unchanged.
    pub fn to_config_file(&self) -> String {
        let gate_scope = match self.risk.gate_scope {
            GateScope::AllManagement => "all",
            GateScope::EntriesOnly => "entries",
        };
        let mut out = String::new();
        out.push_str("# FXLab backtest configuration\n\n[trading]\n");
        out.push_str(&format!("risk_per_trade = {}\n", fmt_float(self.risk.risk_per_trade_pct)));
        out.push_str(&format!("daily_loss_limit = {}\n", fmt_float(self.risk.daily_loss_limit_pct)));
        out.push_str(&format!("stop_loss_pips = {}\n", fmt_float(self.risk.stop_loss_pips)));
        out.push_str(&format!("take_profit_pips = {}\n", fmt_float(self.risk.take_profit_pips)));
        out.push_str(&format!("max_consecutive_losses = {}\n", self.risk.max_consecutive_losses));
        out.push_str(&format!("gate_scope = \"{gate_scope}\"\n"));
        out.push_str(&format!("trading_pairs = \"{}\"\n", self.trading_pairs.join(",")));

        out.push_str("\n[backtest]\n");
        out.push_str(&format!("backtest_initial_balance = {}\n", fmt_float(self.initial_balance)));
        out.push_str(&format!("monte_carlo_runs = {}\n", self.monte_carlo_runs));
        out.push_str(&format!(
            "monte_carlo_confidence_level = {}\n",
            fmt_float(self.monte_carlo_confidence_level)
        ));
        out.push_str(&format!("monte_carlo_seed = {}\n", self.monte_carlo_seed));
        out.push_str(&format!("walk_forward_period_months = {}\n", self.walk_forward_period_months));
        out.push_str(&format!("walk_forward_step_months = {}\n", self.walk_forward_step_months));

        out.push_str("\n[indicators]\n");
        out.push_str(&format!("ema_fast_span = {}\n", self.indicators.ema_fast_span));
        out.push_str(&format!("ema_slow_span = {}\n", self.indicators.ema_slow_span));
        out.push_str(&format!("bb_period = {}\n", self.indicators.bb_period));
        out.push_str(&format!("bb_std_dev = {}\n", fmt_float(self.indicators.bb_std_dev)));
        out.push_str(&format!("rsi_period = {}\n", self.indicators.rsi_period));

        out.push_str("\n[targets]\n");
        out.push_str(&format!("day_1_target = {}\n", fmt_float(self.targets.day1)));
        out.push_str(&format!("day_2_target = {}\n", fmt_float(self.targets.day2)));
        out.push_str(&format!("day_3_plus_target_min = {}\n", fmt_float(self.targets.day3_plus_min)));
        out.push_str(&format!("day_3_plus_target_max = {}\n", fmt_float(self.targets.day3_plus_max)));
        out
    }
}

/// Float literal that TOML reads back as a float (`10.0`, not `10`).
fn fmt_float(v: f64) -> String {
    let s = v.to_string();
    if s.contains(['.', 'e', 'E']) || !v.is_finite() {
        s
    } else {
        format!("{s}.0")
    }
}

// ─── Raw value access ────────────────────────────────────────────────

struct RawValues {
    /// Lower-cased key → raw text.
    values: BTreeMap<String, String>,
    warnings: Vec<ConfigWarning>,
}

impl RawValues {
    fn lookup(&mut self, keys: &[&str]) -> Option<(String, String)> {
        let found = keys
            .iter()
            .find_map(|k| self.values.get(*k).map(|v| (k.to_string(), v.clone())));
        if found.is_none() {
            debug!(key = keys[0], "config key missing; using default");
            self.warnings.push(ConfigWarning {
                kind: WarningKind::MissingKey,
                key: Some(keys[0].to_string()),
                message: "not set; using default".into(),
            });
        }
        found
    }

    fn invalid(&mut self, key: String, raw: &str, default: impl fmt::Display) {
        let warning = ConfigWarning {
            kind: WarningKind::InvalidValue,
            key: Some(key),
            message: format!("invalid value {raw:?}; using default {default}"),
        };
        warn!(%warning, "config value rejected");
        self.warnings.push(warning);
    }

    fn float(&mut self, keys: &[&str], default: f64, valid: impl Fn(&f64) -> bool) -> f64 {
        let Some((key, raw)) = self.lookup(keys) else {
            return default;
        };
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && valid(&v) => v,
            _ => {
                self.invalid(key, &raw, default);
                default
            }
        }
    }

    /// Non-negative integer in `[min, max]`. Whole-number floats such as `8.0` are accepted.
    fn count(&mut self, keys: &[&str], default: u64, min: u64, max: u64) -> u64 {
        let Some((key, raw)) = self.lookup(keys) else {
            return default;
        };
        let parsed = raw.parse::<u64>().ok().or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= u32::MAX as f64)
                .map(|v| v as u64)
        });
        match parsed {
            Some(v) if v >= min && v <= max => v,
            _ => {
                self.invalid(key, &raw, default);
                default
            }
        }
    }

    fn gate_scope(&mut self, keys: &[&str], default: GateScope) -> GateScope {
        let Some((key, raw)) = self.lookup(keys) else {
            return default;
        };
        match raw.to_ascii_lowercase().as_str() {
            "all" | "all_management" => GateScope::AllManagement,
            "entries" | "entries_only" => GateScope::EntriesOnly,
            _ => {
                self.invalid(key, &raw, "all");
                default
            }
        }
    }

    fn symbols(&mut self, keys: &[&str], default: Vec<String>) -> Vec<String> {
        let Some((key, raw)) = self.lookup(keys) else {
            return default;
        };
        let symbols: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            self.invalid(key, &raw, default.join(","));
            return default;
        }
        symbols
    }
}

// ─── File formats ────────────────────────────────────────────────────

/// Flatten nested tables into one key space; the innermost key wins.
fn flatten_toml(table: &toml::Table, out: &mut BTreeMap<String, String>) {
    for (key, value) in table {
        let text = match value {
            toml::Value::Table(inner) => {
                flatten_toml(inner, out);
                continue;
            }
            toml::Value::String(s) => s.clone(),
            toml::Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            other => other.to_string(),
        };
        out.insert(key.to_ascii_lowercase(), text);
    }
}

/// `KEY = value` lines; `#`/`;` comments and `[section]` headers are skipped.
fn parse_lines(text: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(['#', ';']) || line.starts_with('[') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            debug!(line, "ignoring config line without '='");
            continue;
        };
        let value = strip_inline_comment(value.trim())
            .trim()
            .trim_matches(|c| c == '"' || c == '\'');
        out.insert(key.trim().to_ascii_lowercase(), value.to_string());
    }
    out
}

fn strip_inline_comment(value: &str) -> &str {
    [" #", "\t#", " ;", "\t;"]
        .iter()
        .filter_map(|marker| value.find(marker))
        .min()
        .map_or(value, |idx| &value[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_keys(warnings: &[ConfigWarning]) -> Vec<String> {
        warnings
            .iter()
            .filter(|w| w.kind == WarningKind::InvalidValue)
            .filter_map(|w| w.key.clone())
            .collect()
    }

    #[test]
    fn ini_style_file() {
        let text = "\
# trading
[TRADING]
RISK_PER_TRADE=1.0
DAILY_LOSS_LIMIT = 5 ; percent
STOP_LOSS_PIPS=10
TRADING_PAIRS=EURUSD, usdjpy
BACKTEST_INITIAL_BALANCE=250
";
        let (cfg, warnings) = BacktestConfig::parse(text);
        assert_eq!(cfg.risk.risk_per_trade_pct, 1.0);
        assert_eq!(cfg.risk.daily_loss_limit_pct, 5.0);
        assert_eq!(cfg.risk.stop_loss_pips, 10.0);
        assert_eq!(cfg.risk.take_profit_pips, 12.0);
        assert_eq!(cfg.trading_pairs, vec!["EURUSD", "USDJPY"]);
        assert_eq!(cfg.initial_balance, 250.0);
        assert!(invalid_keys(&warnings).is_empty());
        assert!(warnings
            .iter()
            .any(|w| w.kind == WarningKind::MissingKey && w.key.as_deref() == Some("take_profit_pips")));
    }

    #[test]
    fn toml_sections_are_flattened() {
        let text = r#"
[risk]
risk_per_trade = 0.25
max_consecutive_losses = 5
gate_scope = "entries"

[pairs]
trading_pairs = ["gbpusd", "AUDUSD"]

[analysis]
monte_carlo_runs = 500
walk_forward_period_months = 6.0
"#;
        let (cfg, warnings) = BacktestConfig::parse(text);
        assert_eq!(cfg.risk.risk_per_trade_pct, 0.25);
        assert_eq!(cfg.risk.max_consecutive_losses, 5);
        assert_eq!(cfg.risk.gate_scope, GateScope::EntriesOnly);
        assert_eq!(cfg.trading_pairs, vec!["GBPUSD", "AUDUSD"]);
        assert_eq!(cfg.monte_carlo_runs, 500);
        assert_eq!(cfg.walk_forward_period_months, 6);
        assert!(invalid_keys(&warnings).is_empty());
    }

    #[test]
    fn invalid_values_fall_back() {
        let text = "\
RISK_PER_TRADE=lots
STOP_LOSS_PIPS=-3
MONTE_CARLO_RUNS=0
MONTE_CARLO_CONFIDENCE_LEVEL=150
GATE_SCOPE=sometimes
TRADING_PAIRS= , ,
";
        let (cfg, warnings) = BacktestConfig::parse(text);
        let d = BacktestConfig::default();
        assert_eq!(cfg.risk.risk_per_trade_pct, d.risk.risk_per_trade_pct);
        assert_eq!(cfg.risk.stop_loss_pips, d.risk.stop_loss_pips);
        assert_eq!(cfg.monte_carlo_runs, d.monte_carlo_runs);
        assert_eq!(cfg.monte_carlo_confidence_level, 95.0);
        assert_eq!(cfg.risk.gate_scope, GateScope::AllManagement);
        assert_eq!(cfg.trading_pairs, d.trading_pairs);
        let mut keys = invalid_keys(&warnings);
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "gate_scope",
                "monte_carlo_confidence_level",
                "monte_carlo_runs",
                "risk_per_trade",
                "stop_loss_pips",
                "trading_pairs"
            ]
        );
    }

    #[test]
    fn alias_for_initial_balance() {
        let (cfg, _) = BacktestConfig::parse("initial_balance = 500\n");
        assert_eq!(cfg.initial_balance, 500.0);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let (cfg, warnings) = BacktestConfig::load(Path::new("/definitely/not/here/config.ini"));
        assert_eq!(cfg, BacktestConfig::default());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::MissingFile);
    }

    #[test]
    fn config_file_roundtrip() {
        let mut cfg = BacktestConfig::default();
        cfg.risk.gate_scope = GateScope::EntriesOnly;
        cfg.initial_balance = 1234.5;
        cfg.trading_pairs = vec!["EURJPY".into()];
        let (parsed, warnings) = BacktestConfig::parse(&cfg.to_config_file());
        assert_eq!(parsed, cfg);
        assert!(invalid_keys(&warnings).is_empty());
        assert!(warnings.iter().all(|w| w.kind != WarningKind::MissingKey));
    }

    #[test]
    fn derived_configs_carry_settings() {
        let cfg = BacktestConfig::default();
        assert_eq!(cfg.monte_carlo().runs, 1000);
        assert_eq!(cfg.monte_carlo().seed, 42);
        assert_eq!(cfg.walk_forward().period_months, 12);
        assert_eq!(cfg.strategy().risk.max_consecutive_losses, 3);
        assert_eq!(cfg.config_hash(), BacktestConfig::default().config_hash());
        assert_eq!(cfg.config_hash().len(), 64);
    }
}
