//! Configuration validation.
//!
//! Validates all settings fields before a scoring run.

use crate::domain::drawdown::Scale;
use crate::domain::error::RiskError;
use crate::domain::pipeline::AssetFailurePolicy;
use crate::ports::config_port::ConfigPort;

const COLUMN_KEYS: [(&str, &str); 8] = [
    ("data", "index_column"),
    ("data", "price_column"),
    ("data", "group_column"),
    ("data", "default_series_id"),
    ("forecast", "id_column"),
    ("forecast", "timestamp_column"),
    ("forecast", "quantile_column"),
    ("forecast", "value_column"),
];

pub fn validate_settings_config(config: &dyn ConfigPort) -> Result<(), RiskError> {
    validate_quantile_level(config)?;
    validate_quantile_levels(config)?;
    validate_fallback_scale(config)?;
    validate_failure_policy(config)?;
    validate_column_labels(config)?;
    Ok(())
}

/// Comma-separated levels, each strictly inside (0, 1).
pub fn parse_quantile_levels(input: &str) -> Result<Vec<f64>, String> {
    let mut levels = Vec::new();
    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err("empty token in quantile list".to_string());
        }
        let level: f64 = trimmed
            .parse()
            .map_err(|_| format!("'{}' is not a number", trimmed))?;
        if !(level > 0.0 && level < 1.0) {
            return Err(format!("{} is outside (0, 1)", level));
        }
        levels.push(level);
    }
    Ok(levels)
}

fn invalid(section: &str, key: &str, reason: String) -> RiskError {
    RiskError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}

fn validate_quantile_level(config: &dyn ConfigPort) -> Result<(), RiskError> {
    let value = config.get_double("forecast", "quantile_level", 0.5);
    if !(value > 0.0 && value < 1.0) {
        return Err(invalid(
            "forecast",
            "quantile_level",
            "quantile_level must be between 0 and 1 (exclusive)".to_string(),
        ));
    }
    // get_double falls back to the default on garbage; catch that here
    if let Some(raw) = config.get_string("forecast", "quantile_level") {
        if raw.trim().parse::<f64>().is_err() {
            return Err(invalid(
                "forecast",
                "quantile_level",
                format!("'{}' is not a number", raw),
            ));
        }
    }
    Ok(())
}

fn validate_quantile_levels(config: &dyn ConfigPort) -> Result<(), RiskError> {
    match config.get_string("forecast", "quantile_levels") {
        Some(raw) => parse_quantile_levels(&raw)
            .map(|_| ())
            .map_err(|reason| invalid("forecast", "quantile_levels", reason)),
        None => Ok(()),
    }
}

fn validate_fallback_scale(config: &dyn ConfigPort) -> Result<(), RiskError> {
    match config.get_string("forecast", "fallback_scale") {
        Some(raw) => raw
            .parse::<Scale>()
            .map(|_| ())
            .map_err(|reason| invalid("forecast", "fallback_scale", reason)),
        None => Ok(()),
    }
}

fn validate_failure_policy(config: &dyn ConfigPort) -> Result<(), RiskError> {
    match config.get_string("portfolio", "on_asset_error") {
        Some(raw) => raw
            .parse::<AssetFailurePolicy>()
            .map(|_| ())
            .map_err(|reason| invalid("portfolio", "on_asset_error", reason)),
        None => Ok(()),
    }
}

fn validate_column_labels(config: &dyn ConfigPort) -> Result<(), RiskError> {
    for (section, key) in COLUMN_KEYS {
        if let Some(raw) = config.get_string(section, key) {
            if raw.trim().is_empty() {
                return Err(invalid(section, key, format!("{} must not be empty", key)));
            }
        }
    }
    Ok(())
}
