//! FXLab Core: domain types, indicators, signals, and the trade simulator.
//!
//! This crate contains the per-symbol half of the backtester:
//! - Domain types (price bars, instruments, positions, trades)
//! - Indicator engine (EMA, Bollinger Bands, RSI)
//! - Signal generator (trend-pullback entries with conflict suppression)
//! - Bar-by-bar simulator with daily-loss and loss-streak gates
//! - Deterministic BLAKE3 RNG hierarchy for reproducible resampling

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod rng;
pub mod signals;
