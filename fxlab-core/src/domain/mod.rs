//! Domain types for FXLab

pub mod bar;
pub mod instrument;
pub mod position;
pub mod trade;

pub use bar::{validate_series, BarError, PriceBar};
pub use instrument::{Instrument, JPY_PIP, LOT_UNITS, STANDARD_PIP};
pub use position::{Direction, ExitReason, Position};
pub use trade::Trade;
