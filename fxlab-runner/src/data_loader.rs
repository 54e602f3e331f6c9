//! Price-series loading for the runner.
//!
//! Each symbol is read from `<data_dir>/<SYMBOL>.csv`. Rows that cannot be
//! parsed are skipped with a warning and rows that do not advance the clock
//! are dropped, so every series handed to the engine is strictly ascending.
//! Synthetic series are a demo/test mode: deterministic random walks seeded
//! from the symbol.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use fxlab_core::domain::{Instrument, PriceBar, JPY_PIP};
use fxlab_core::rng::RngHierarchy;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no data file for '{symbol}' at {}", .path.display())]
    NotFound { symbol: String, path: PathBuf },

    #[error("{}: missing required column '{column}'", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{}: no usable rows", .path.display())]
    Empty { path: PathBuf },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

const TIMESTAMP_COLUMNS: [&str; 5] = ["timestamp", "datetime", "date", "time", "date_time"];

/// Path of a symbol's CSV file inside `data_dir`.
pub fn symbol_path(data_dir: &Path, symbol: &str) -> PathBuf {
    data_dir.join(format!("{}.csv", symbol.to_ascii_uppercase()))
}

/// Load a symbol from `data_dir` via [`symbol_path`].
pub fn load_symbol(data_dir: &Path, symbol: &str) -> Result<Vec<PriceBar>, LoadError> {
    let path = symbol_path(data_dir, symbol);
    if !path.exists() {
        return Err(LoadError::NotFound {
            symbol: symbol.to_string(),
            path,
        });
    }
    load_price_csv(&path, symbol)
}

/// Read `timestamp,open,high,low,close[,volume]` rows. Header names are case-insensitive.
pub fn load_price_csv(path: &Path, symbol: &str) -> Result<Vec<PriceBar>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_ascii_lowercase())
        .collect();
    let find = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));
    let missing = |column: &'static str| LoadError::MissingColumn {
        path: path.to_path_buf(),
        column,
    };

    let ts_col = find(&TIMESTAMP_COLUMNS).ok_or_else(|| missing("timestamp"))?;
    let open_col = find(&["open"]).ok_or_else(|| missing("open"))?;
    let high_col = find(&["high"]).ok_or_else(|| missing("high"))?;
    let low_col = find(&["low"]).ok_or_else(|| missing("low"))?;
    let close_col = find(&["close"]).ok_or_else(|| missing("close"))?;
    let volume_col = find(&["volume"]);

    let mut bars: Vec<PriceBar> = Vec::new();
    let mut skipped = 0usize;
    let mut out_of_order = 0usize;

    for (row, record) in reader.records().enumerate() {
        // Header is line 1.
        let line = row + 2;
        let record = match record {
            Ok(r) => r,
            Err(err) => {
                warn!(symbol, line, error = %err, "skipping unreadable row");
                skipped += 1;
                continue;
            }
        };

        let field = |idx: usize| record.get(idx).unwrap_or("");
        let price = |idx: usize| field(idx).parse::<f64>().ok();

        let (Some(timestamp), Some(open), Some(high), Some(low), Some(close)) = (
            parse_timestamp(field(ts_col)),
            price(open_col),
            price(high_col),
            price(low_col),
            price(close_col),
        ) else {
            warn!(symbol, line, "skipping malformed row");
            skipped += 1;
            continue;
        };

        let bar = PriceBar {
            symbol: symbol.to_string(),
            timestamp,
            open,
            high,
            low,
            close,
            volume: volume_col.and_then(|idx| field(idx).parse::<f64>().ok()),
        };
        if let Err(err) = bar.check_prices(bars.len()) {
            warn!(symbol, line, error = %err, "skipping row with invalid prices");
            skipped += 1;
            continue;
        }
        if bars.last().is_some_and(|prev| bar.timestamp <= prev.timestamp) {
            debug!(symbol, line, %bar.timestamp, "dropping out-of-order row");
            out_of_order += 1;
            continue;
        }
        bars.push(bar);
    }

    if skipped > 0 || out_of_order > 0 {
        warn!(
            symbol,
            kept = bars.len(),
            skipped,
            out_of_order,
            "price file had unusable rows"
        );
    }
    if bars.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    debug!(symbol, bars = bars.len(), path = %path.display(), "loaded price series");
    Ok(bars)
}

/// Parse the timestamp forms found in exported price files.
///
/// Offsets are normalized to UTC; a bare date is midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Some(dt.naive_utc());
        }
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

// ─── Synthetic data ──────────────────────────────────────────────────

/// Generate `count` hourly bars of a random walk, skipping weekends.
///
/// The walk is seeded from `seed` and the symbol, so two symbols with the
/// same seed still differ. JPY-quoted pairs start near 145, others near 1.10.
pub fn synthetic_bars(symbol: &str, start: NaiveDateTime, count: usize, seed: u64) -> Vec<PriceBar> {
    let mut rng = RngHierarchy::new(seed).rng_for(symbol, 0);
    let jpy = Instrument::from_symbol(symbol).pip_size == JPY_PIP;
    let mut price = if jpy { 145.0 } else { 1.10 };

    let mut bars = Vec::with_capacity(count);
    let mut current = start;
    while bars.len() < count {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += Duration::hours(1);
            continue;
        }

        let hourly_return: f64 = rng.gen_range(-0.0015..0.0015);
        let open = price;
        let close = price * (1.0 + hourly_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.0005));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.0005));
        let volume = rng.gen_range(100.0..5_000.0);

        bars.push(PriceBar {
            symbol: symbol.to_string(),
            timestamp: current,
            open,
            high,
            low,
            close,
            volume: Some(volume),
        });
        price = close;
        current += Duration::hours(1);
    }
    bars
}

/// Deterministic BLAKE3 hash over a set of series, in the order given.
pub fn dataset_hash<'a>(series: impl IntoIterator<Item = &'a [PriceBar]>) -> String {
    let mut hasher = blake3::Hasher::new();
    for bars in series {
        for bar in bars {
            hasher.update(bar.symbol.as_bytes());
            hasher.update(&bar.timestamp.and_utc().timestamp().to_le_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
