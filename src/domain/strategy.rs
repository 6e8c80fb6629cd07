//! Investor strategy parameters for a single position.

use crate::domain::error::RiskError;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

const SECTION: &str = "strategy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn parse(value: &str) -> Option<Side> {
        match value.trim().to_lowercase().as_str() {
            "long" => Some(Side::Long),
            "short" => Some(Side::Short),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyConfig {
    pub entry_price: f64,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    /// Planned holding period in trading days; sets the forecast horizon.
    pub holding_period_days: u32,
    /// Aggregation weight within a portfolio.
    pub position_size_pct: f64,
    pub symbol: Option<String>,
    pub side: Side,
}

impl StrategyConfig {
    /// Build from a generic key-value mapping.
    ///
    /// Required keys: `entry_price`, `take_profit_pct`, `stop_loss_pct`,
    /// `holding_period_days`. Optional: `position_size_pct` (1.0), `symbol`,
    /// `side` ("long").
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, RiskError> {
        let strategy = StrategyConfig {
            entry_price: required_f64(map, "entry_price")?,
            take_profit_pct: required_f64(map, "take_profit_pct")?,
            stop_loss_pct: required_f64(map, "stop_loss_pct")?,
            holding_period_days: parse_days(required(map, "holding_period_days")?)?,
            position_size_pct: match map.get("position_size_pct") {
                Some(v) => parse_f64("position_size_pct", v)?,
                None => 1.0,
            },
            symbol: map
                .get("symbol")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            side: match map.get("side") {
                Some(v) => Side::parse(v).ok_or_else(|| invalid("side", "expected long or short"))?,
                None => Side::Long,
            },
        };
        strategy.validate()?;
        Ok(strategy)
    }

    pub fn validate(&self) -> Result<(), RiskError> {
        if !(self.entry_price > 0.0) || !self.entry_price.is_finite() {
            return Err(invalid("entry_price", "entry_price must be positive"));
        }
        if !(self.take_profit_pct >= 0.0) {
            return Err(invalid("take_profit_pct", "take_profit_pct must be non-negative"));
        }
        if !(self.stop_loss_pct >= 0.0) {
            return Err(invalid("stop_loss_pct", "stop_loss_pct must be non-negative"));
        }
        if self.holding_period_days < 1 {
            return Err(invalid(
                "holding_period_days",
                "holding_period_days must be at least 1",
            ));
        }
        if !(self.position_size_pct >= 0.0) || !self.position_size_pct.is_finite() {
            return Err(invalid(
                "position_size_pct",
                "position_size_pct must be a non-negative number",
            ));
        }
        Ok(())
    }

    pub fn horizon(&self) -> usize {
        self.holding_period_days as usize
    }

    pub fn take_profit_price(&self) -> f64 {
        self.entry_price * (1.0 + self.take_profit_pct)
    }

    pub fn stop_loss_price(&self) -> f64 {
        self.entry_price * (1.0 - self.stop_loss_pct)
    }
}

fn required<'a>(map: &'a HashMap<String, String>, key: &str) -> Result<&'a str, RiskError> {
    map.get(key)
        .map(String::as_str)
        .ok_or_else(|| RiskError::ConfigMissing {
            section: SECTION.to_string(),
            key: key.to_string(),
        })
}

fn required_f64(map: &HashMap<String, String>, key: &str) -> Result<f64, RiskError> {
    parse_f64(key, required(map, key)?)
}

fn parse_f64(key: &str, value: &str) -> Result<f64, RiskError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| invalid(key, &format!("'{}' is not a number", value)))
}

// Accepts "20" and "20.0" but not fractional days.
fn parse_days(value: &str) -> Result<u32, RiskError> {
    let trimmed = value.trim();
    if let Ok(days) = trimmed.parse::<u32>() {
        return Ok(days);
    }
    match trimmed.parse::<f64>() {
        Ok(days) if days.fract() == 0.0 && days >= 0.0 && days <= u32::MAX as f64 => {
            Ok(days as u32)
        }
        _ => Err(invalid(
            "holding_period_days",
            &format!("'{}' is not a whole number of days", value),
        )),
    }
}

fn invalid(key: &str, reason: &str) -> RiskError {
    RiskError::ConfigInvalid {
        section: SECTION.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
