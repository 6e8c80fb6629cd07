//! Maximum drawdown along a forecast trajectory.

use crate::domain::error::RiskError;
use crate::domain::forecast::Extraction;
use std::fmt;
use std::str::FromStr;

/// Largest |value| still read as a log-price when the scale is undeclared.
/// exp(50) is about 5e21, beyond any quoted price.
pub const MAX_LOG_MAGNITUDE: f64 = 50.0;

/// Declared scale of a trajectory's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Log,
    Linear,
    /// Resolved against the last observed log-price when one is known
    /// (see [`infer_scale`]); otherwise log when every value is a plausible
    /// log-price, linear when not.
    Unknown,
}

impl FromStr for Scale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "log" => Ok(Scale::Log),
            "linear" | "raw" => Ok(Scale::Linear),
            "unknown" | "auto" => Ok(Scale::Unknown),
            other => Err(format!("unknown scale '{}', expected log, linear or unknown", other)),
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scale::Log => write!(f, "log"),
            Scale::Linear => write!(f, "linear"),
            Scale::Unknown => write!(f, "unknown"),
        }
    }
}

/// Pick the scale of a forecast value by which reading lands closer to the
/// last observed log-price `anchor`: the value itself as a log-price, or its
/// logarithm as a raw price.
pub fn infer_scale(sample: f64, anchor: f64) -> Scale {
    if !sample.is_finite() || !anchor.is_finite() || sample <= 0.0 {
        return Scale::Log;
    }
    let as_log = (sample - anchor).abs();
    let as_linear = (sample.ln() - anchor).abs();
    if as_linear < as_log {
        Scale::Linear
    } else {
        Scale::Log
    }
}

/// Maximum fractional decline from the running peak of `exp(log_values)`.
///
/// Returns 0.0 for an empty or non-decreasing trajectory.
pub fn max_drawdown(log_values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for price in log_values.iter().map(|v| v.exp()) {
        if price > peak {
            peak = price;
        }
        let dd = 1.0 - price / peak;
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

/// Bring a trajectory onto the log scale, validating it on the way.
pub fn to_log_scale(values: &[f64], scale: Scale) -> Result<Vec<f64>, RiskError> {
    match scale {
        Scale::Log => {
            for &v in values {
                let price = v.exp();
                if !v.is_finite() || !price.is_finite() || price <= 0.0 {
                    return Err(RiskError::validation(format!(
                        "log-scale value {} cannot be reconstructed as a price",
                        v
                    )));
                }
            }
            Ok(values.to_vec())
        }
        Scale::Linear => values
            .iter()
            .map(|&v| {
                if v > 0.0 && v.is_finite() {
                    Ok(v.ln())
                } else {
                    Err(RiskError::validation(format!(
                        "linear-scale value {} is not a positive price",
                        v
                    )))
                }
            })
            .collect(),
        Scale::Unknown => {
            let plausible_log = values
                .iter()
                .all(|v| v.is_finite() && v.abs() <= MAX_LOG_MAGNITUDE);
            if plausible_log {
                to_log_scale(values, Scale::Log)
            } else {
                tracing::warn!(
                    points = values.len(),
                    "trajectory is not a plausible log-price path, re-deriving log scale"
                );
                to_log_scale(values, Scale::Linear)
            }
        }
    }
}

pub fn trajectory_drawdown(values: &[f64], scale: Scale) -> Result<f64, RiskError> {
    Ok(max_drawdown(&to_log_scale(values, scale)?))
}

/// Mean of the per-series maximum drawdowns; 0.0 when nothing was extracted.
pub fn expected_max_drawdown(extraction: &Extraction) -> Result<f64, RiskError> {
    if extraction.trajectories.is_empty() {
        return Ok(0.0);
    }
    let mut total = 0.0;
    for (series_id, values) in &extraction.trajectories {
        let dd = trajectory_drawdown(values, extraction.scale).map_err(|e| match e {
            RiskError::Validation { reason } => {
                RiskError::validation(format!("series '{}': {}", series_id, reason))
            }
            other => other,
        })?;
        tracing::debug!(series = %series_id, drawdown = dd, "series drawdown");
        total += dd;
    }
    Ok(total / extraction.trajectories.len() as f64)
}
