//! Drawdown to behavioural-risk score mapping.

use serde::Serialize;
use std::fmt;

/// Per-asset outcome: score in [0, 100] and the drawdown it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskResult {
    pub score: u8,
    pub drawdown: f64,
}

impl RiskResult {
    pub fn from_drawdown(drawdown: f64) -> Self {
        Self {
            score: risk_score_from_drawdown(drawdown),
            drawdown,
        }
    }

    pub fn level(&self) -> RiskLevel {
        RiskLevel::from_score(self.score as f64)
    }
}

/// `floor(100 * sqrt(d))`, capped at 100.
///
/// The square root spreads small drawdowns over more of the scale: a 4.29%
/// drawdown scores 20, 0.4% scores 6.
pub fn risk_score_from_drawdown(drawdown: f64) -> u8 {
    if !(drawdown > 0.0) {
        return 0;
    }
    let score = (100.0 * drawdown.sqrt()).floor();
    score.min(100.0) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RiskLevel {
    VeryLow,
    Low,
    Moderate,
    High,
    Extreme,
}

impl RiskLevel {
    /// Portfolio scores are fractional and are rounded before banding.
    pub fn from_score(score: f64) -> Self {
        let rounded = score.round();
        if rounded < 20.0 {
            RiskLevel::VeryLow
        } else if rounded < 40.0 {
            RiskLevel::Low
        } else if rounded < 60.0 {
            RiskLevel::Moderate
        } else if rounded < 80.0 {
            RiskLevel::High
        } else {
            RiskLevel::Extreme
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::VeryLow => "Very Low",
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
            RiskLevel::Extreme => "Extreme",
        };
        write!(f, "{}", s)
    }
}
