//! Domain error types.

use std::collections::BTreeSet;

/// Top-level error type for blackguard.
#[derive(Debug, thiserror::Error)]
pub enum RiskError {
    #[error("validation error: {reason}")]
    Validation { reason: String },

    #[error("asset ids differ between price data and strategies: {}", format_ids(.difference))]
    KeyMismatch { difference: BTreeSet<String> },

    #[error("forecaster unavailable: {reason}")]
    ForecastUnavailable { reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RiskError {
    pub fn validation(reason: impl Into<String>) -> Self {
        RiskError::Validation {
            reason: reason.into(),
        }
    }

    pub fn data(reason: impl Into<String>) -> Self {
        RiskError::Data {
            reason: reason.into(),
        }
    }
}

fn format_ids(ids: &BTreeSet<String>) -> String {
    let joined: Vec<&str> = ids.iter().map(String::as_str).collect();
    format!("{{{}}}", joined.join(", "))
}

impl From<&RiskError> for std::process::ExitCode {
    fn from(err: &RiskError) -> Self {
        let code: u8 = match err {
            RiskError::Io(_) | RiskError::Data { .. } => 1,
            RiskError::ConfigParse { .. }
            | RiskError::ConfigMissing { .. }
            | RiskError::ConfigInvalid { .. } => 2,
            RiskError::Validation { .. } => 3,
            RiskError::KeyMismatch { .. } => 4,
            RiskError::ForecastUnavailable { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
