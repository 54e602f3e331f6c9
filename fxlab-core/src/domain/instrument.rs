//! Currency-pair metadata: pip size and lot contract size.

use serde::{Deserialize, Serialize};

/// Units of base currency in one standard lot.
pub const LOT_UNITS: f64 = 100_000.0;

/// Pip size for pairs quoted in anything but JPY.
pub const STANDARD_PIP: f64 = 0.0001;

/// Pip size for JPY-quoted pairs.
pub const JPY_PIP: f64 = 0.01;

/// A tradable currency pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub pip_size: f64,
}

impl Instrument {
    /// Derive the instrument from a symbol such as `EURUSD`, `USD/JPY`, or `USDJPY=X`.
    ///
    /// A six-letter pair is split into base and quote; otherwise any `JPY`
    /// in the symbol marks it as JPY-quoted.
    pub fn from_symbol(symbol: &str) -> Self {
        let letters: String = symbol
            .split('=')
            .next()
            .unwrap_or(symbol)
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        let jpy_quoted = if letters.len() == 6 {
            &letters[3..] == "JPY"
        } else {
            letters.contains("JPY")
        };

        Self {
            symbol: symbol.to_string(),
            pip_size: if jpy_quoted { JPY_PIP } else { STANDARD_PIP },
        }
    }

    /// Convert a distance in pips to a price distance.
    pub fn pips_to_price(&self, pips: f64) -> f64 {
        pips * self.pip_size
    }
}
