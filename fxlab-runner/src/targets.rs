//! Return targets and the rating of a backtest against them.

use serde::{Deserialize, Serialize};

/// Return targets in percent of the initial balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTargets {
    pub day1: f64,
    pub day2: f64,
    pub day3_plus_min: f64,
    pub day3_plus_max: f64,
}

impl Default for PerformanceTargets {
    fn default() -> Self {
        Self {
            day1: 900.0,
            day2: 200.0,
            day3_plus_min: 2.0,
            day3_plus_max: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRating {
    Exceptional,
    Excellent,
    VeryGood,
    Good,
    Acceptable,
    Poor,
}

impl TargetRating {
    /// Highest band the return reaches.
    pub fn rate(actual_return: f64, targets: &PerformanceTargets) -> Self {
        if actual_return >= targets.day1 {
            TargetRating::Exceptional
        } else if actual_return >= targets.day2 {
            TargetRating::Excellent
        } else if actual_return >= targets.day3_plus_max {
            TargetRating::VeryGood
        } else if actual_return >= targets.day3_plus_min {
            TargetRating::Good
        } else if actual_return >= 0.0 {
            TargetRating::Acceptable
        } else {
            TargetRating::Poor
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TargetRating::Exceptional => "EXCEPTIONAL - Exceeded Day 1 target",
            TargetRating::Excellent => "EXCELLENT - Exceeded Day 2 target",
            TargetRating::VeryGood => "VERY GOOD - Exceeded Day 3+ maximum target",
            TargetRating::Good => "GOOD - Met Day 3+ minimum target",
            TargetRating::Acceptable => "ACCEPTABLE - Positive return",
            TargetRating::Poor => "POOR - Negative return",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetComparison {
    /// Net profit as a percent of the initial balance.
    pub actual_return: f64,
    pub targets: PerformanceTargets,
    pub met_day1: bool,
    pub met_day2: bool,
    pub met_day3_min: bool,
    pub rating: TargetRating,
}

impl TargetComparison {
    pub fn evaluate(net_profit: f64, initial_balance: f64, targets: &PerformanceTargets) -> Self {
        let actual_return = if initial_balance == 0.0 {
            0.0
        } else {
            net_profit / initial_balance * 100.0
        };
        Self {
            actual_return,
            targets: targets.clone(),
            met_day1: actual_return >= targets.day1,
            met_day2: actual_return >= targets.day2,
            met_day3_min: actual_return >= targets.day3_plus_min,
            rating: TargetRating::rate(actual_return, targets),
        }
    }
}
