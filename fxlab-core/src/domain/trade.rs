//! Trade: a closed position with realized P&L.

use super::position::{Direction, ExitReason, Position};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A complete round-trip trade: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Identification ──
    pub symbol: String,
    pub direction: Direction,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size and risk levels ──
    pub lot_size: f64,
    pub stop_loss: f64,
    pub take_profit: f64,

    // ── Result ──
    pub pnl: f64,
    pub duration_secs: i64,
}

impl Trade {
    /// Close `position` at `exit_price` on the given bar.
    pub fn close(
        position: Position,
        exit_bar: usize,
        exit_time: NaiveDateTime,
        exit_price: f64,
        exit_reason: ExitReason,
    ) -> Self {
        let pnl = position.pnl_at(exit_price);
        Self {
            duration_secs: (exit_time - position.entry_time).num_seconds(),
            symbol: position.symbol,
            direction: position.direction,
            entry_bar: position.entry_bar,
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            exit_bar,
            exit_time,
            exit_price,
            exit_reason,
            lot_size: position.lot_size,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
            pnl,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_secs)
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_trade() -> Trade {
        let entry = Position {
            symbol: "GBPUSD".into(),
            direction: Direction::Long,
            entry_bar: 4,
            entry_time: NaiveDate::from_ymd_opt(2024, 3, 5)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            entry_price: 1.2500,
            lot_size: 0.05,
            stop_loss: 1.2492,
            take_profit: 1.2512,
        };
        Trade::close(
            entry,
            9,
            NaiveDate::from_ymd_opt(2024, 3, 5)
                .unwrap()
                .and_hms_opt(12, 30, 0)
                .unwrap(),
            1.2512,
            ExitReason::TakeProfit,
        )
    }

    #[test]
    fn close_computes_pnl_and_duration() {
        let trade = sample_trade();
        // 0.05 * 100_000 * 0.0012 = 6.0
        assert!((trade.pnl - 6.0).abs() < 1e-9);
        assert_eq!(trade.duration_secs, 9_000);
        assert_eq!(trade.duration(), Duration::minutes(150));
        assert!(trade.is_winner());
        assert!(!trade.is_loser());
    }

    #[test]
    fn trade_serialization_roundtrip() {
        let trade = sample_trade();
        let json = serde_json::to_string(&trade).unwrap();
        assert!(json.contains("\"direction\":\"long\""));
        assert!(json.contains("\"exit_reason\":\"take_profit\""));
        let deser: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, deser);
    }
}
