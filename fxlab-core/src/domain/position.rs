use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::instrument::LOT_UNITS;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

/// An open trade with fixed stop-loss and take-profit levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub direction: Direction,
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    /// Size in standard lots.
    pub lot_size: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl Position {
    /// Exit check against a closing price. Stop-loss wins if both levels are crossed.
    pub fn exit_trigger(&self, close: f64) -> Option<ExitReason> {
        match self.direction {
            Direction::Long => {
                if close <= self.stop_loss {
                    Some(ExitReason::StopLoss)
                } else if close >= self.take_profit {
                    Some(ExitReason::TakeProfit)
                } else {
                    None
                }
            }
            Direction::Short => {
                if close >= self.stop_loss {
                    Some(ExitReason::StopLoss)
                } else if close <= self.take_profit {
                    Some(ExitReason::TakeProfit)
                } else {
                    None
                }
            }
        }
    }

    /// Realized P&L in account currency if closed at `exit_price`.
    pub fn pnl_at(&self, exit_price: f64) -> f64 {
        self.direction.sign() * (exit_price - self.entry_price) * self.lot_size * LOT_UNITS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn position(direction: Direction) -> Position {
        let (stop_loss, take_profit) = match direction {
            Direction::Long => (1.0992, 1.1012),
            Direction::Short => (1.1008, 1.0988),
        };
        Position {
            symbol: "EURUSD".into(),
            direction,
            entry_bar: 0,
            entry_time: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            entry_price: 1.1000,
            lot_size: 0.10,
            stop_loss,
            take_profit,
        }
    }

    #[test]
    fn long_exit_levels() {
        let p = position(Direction::Long);
        assert_eq!(p.exit_trigger(1.1000), None);
        assert_eq!(p.exit_trigger(1.0992), Some(ExitReason::StopLoss));
        assert_eq!(p.exit_trigger(1.0900), Some(ExitReason::StopLoss));
        assert_eq!(p.exit_trigger(1.1012), Some(ExitReason::TakeProfit));
    }

    #[test]
    fn short_exit_levels() {
        let p = position(Direction::Short);
        assert_eq!(p.exit_trigger(1.1000), None);
        assert_eq!(p.exit_trigger(1.1008), Some(ExitReason::StopLoss));
        assert_eq!(p.exit_trigger(1.0988), Some(ExitReason::TakeProfit));
    }

    #[test]
    fn pnl_sign_follows_direction() {
        // 0.10 lots * 100k * 0.0012 = 12.0
        let long = position(Direction::Long);
        assert!((long.pnl_at(1.1012) - 12.0).abs() < 1e-9);
        let short = position(Direction::Short);
        assert!((short.pnl_at(1.1012) + 12.0).abs() < 1e-9);
    }
}
