//! Trailing-window statistics over a value series.
//!
//! Windows are counted in bars, not wall-clock time. Output index `i` covers
//! `values[i + 1 - period ..= i]`; earlier indices are `NaN`.

/// Mean and population standard deviation of one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl WindowStats {
    /// Population statistics (divide by N) of a non-empty window.
    ///
    /// A constant window reports its value and exactly zero deviation.
    pub fn of(window: &[f64]) -> Self {
        let first = window[0];
        if window.iter().all(|&v| v == first) {
            return Self {
                mean: first,
                std_dev: 0.0,
            };
        }
        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let variance = window
            .iter()
            .map(|&v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / n;
        Self {
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

/// Trailing statistics for every full window; `None` during warm-up.
pub fn window_stats(values: &[f64], period: usize) -> Vec<Option<WindowStats>> {
    let n = values.len();
    let mut result = vec![None; n];
    if period == 0 || n < period {
        return result;
    }
    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = Some(WindowStats::of(window));
    }
    result
}

/// Trailing simple moving average; `NaN` during warm-up.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    window_stats(values, period)
        .into_iter()
        .map(|s| s.map_or(f64::NAN, |s| s.mean))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn mean_of_sliding_windows() {
        let result = rolling_mean(&[10.0, 11.0, 12.0, 13.0, 14.0], 3);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
        assert_approx(result[4], 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn population_std_dev() {
        // mean 5, squared deviations 9+1+1+1+0+0+4+16 = 32, /8 = 4
        let stats = WindowStats::of(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_approx(stats.mean, 5.0, DEFAULT_EPSILON);
        assert_approx(stats.std_dev, 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn constant_window_is_exact() {
        let stats = WindowStats::of(&[1.1; 20]);
        assert_eq!(stats.mean, 1.1);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn short_series_all_warmup() {
        assert!(window_stats(&[1.0, 2.0], 3).iter().all(Option::is_none));
        assert!(rolling_mean(&[1.0, 2.0], 0).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn nan_in_window_is_skipped() {
        let stats = window_stats(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2);
        assert!(stats[1].is_none());
        assert!(stats[2].is_none());
        assert!(stats[3].is_some());
    }
}
