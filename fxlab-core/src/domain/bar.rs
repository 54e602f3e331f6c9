//! PriceBar: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLC(V) bar for a single symbol at a single timestamp.
///
/// Bars within one series are strictly ascending by `timestamp`. Spacing may be
/// irregular (weekends, gaps); rolling computations work on bar index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

/// Why a bar or a series was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar {index} at {timestamp}: {field} is not a positive finite price ({value})")]
    InvalidPrice {
        index: usize,
        timestamp: NaiveDateTime,
        field: &'static str,
        value: f64,
    },
    #[error("bar {index}: timestamp {timestamp} does not follow {previous}")]
    NotAscending {
        index: usize,
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },
}

impl PriceBar {
    /// Check that every OHLC price is positive and finite.
    pub fn check_prices(&self, index: usize) -> Result<(), BarError> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(BarError::InvalidPrice {
                    index,
                    timestamp: self.timestamp,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Validate a whole series: positive finite prices, strictly ascending timestamps.
///
/// Returns the first problem found.
pub fn validate_series(bars: &[PriceBar]) -> Result<(), BarError> {
    for (i, bar) in bars.iter().enumerate() {
        bar.check_prices(i)?;
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(BarError::NotAscending {
                index: i,
                timestamp: bar.timestamp,
                previous: bars[i - 1].timestamp,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_bar(hour: u32) -> PriceBar {
        PriceBar {
            symbol: "EURUSD".into(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            open: 1.1000,
            high: 1.1020,
            low: 1.0990,
            close: 1.1010,
            volume: Some(1_000.0),
        }
    }

    #[test]
    fn valid_series_passes() {
        let bars = vec![sample_bar(0), sample_bar(1), sample_bar(2)];
        assert!(validate_series(&bars).is_ok());
    }

    #[test]
    fn empty_series_is_valid() {
        assert!(validate_series(&[]).is_ok());
    }

    #[test]
    fn nan_close_rejected() {
        let mut bar = sample_bar(0);
        bar.close = f64::NAN;
        let err = validate_series(&[bar]).unwrap_err();
        assert!(matches!(err, BarError::InvalidPrice { field: "close", .. }));
    }

    #[test]
    fn non_positive_open_rejected() {
        let mut bar = sample_bar(0);
        bar.open = 0.0;
        assert!(validate_series(&[bar]).is_err());
    }

    #[test]
    fn duplicate_timestamp_rejected() {
        let bars = vec![sample_bar(1), sample_bar(1)];
        let err = validate_series(&bars).unwrap_err();
        assert!(matches!(err, BarError::NotAscending { index: 1, .. }));
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar(3);
        let json = serde_json::to_string(&bar).unwrap();
        let deser: PriceBar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
