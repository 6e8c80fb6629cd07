//! Forecast-to-risk pipeline for a single asset and for a portfolio.
//!
//! Stages: normalize price history, request a forecast over the holding
//! period, extract the representative quantile path, take its expected
//! maximum drawdown and map that to a score. The portfolio run repeats this
//! per asset and combines the scores by position size.

use crate::domain::drawdown::{expected_max_drawdown, Scale};
use crate::domain::error::RiskError;
use crate::domain::forecast::{ForecastColumns, ForecastFrame, QuantileLevel};
use crate::domain::portfolio::{aggregate_portfolio, check_asset_keys, PortfolioResult};
use crate::domain::score::RiskResult;
use crate::domain::series::{normalize_prices, NormalizeOptions};
use crate::domain::strategy::{Side, StrategyConfig};
use crate::domain::table::Table;
use crate::ports::forecast_port::{ForecastPort, ForecastRequest};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

pub const DEFAULT_QUANTILE_LEVELS: [f64; 5] = [0.1, 0.25, 0.5, 0.75, 0.9];

/// What a portfolio run does when one asset fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssetFailurePolicy {
    #[default]
    Skip,
    Abort,
}

impl FromStr for AssetFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(AssetFailurePolicy::Skip),
            "abort" => Ok(AssetFailurePolicy::Abort),
            other => Err(format!("unknown policy '{}', expected skip or abort", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskSettings {
    pub normalize: NormalizeOptions,
    pub forecast_columns: ForecastColumns,
    /// Level of the representative trajectory.
    pub quantile_level: QuantileLevel,
    /// Levels requested from the forecaster.
    pub quantile_levels: Vec<f64>,
    pub fallback_scale: Scale,
    pub on_asset_error: AssetFailurePolicy,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            normalize: NormalizeOptions::default(),
            forecast_columns: ForecastColumns::default(),
            quantile_level: QuantileLevel::MEDIAN,
            quantile_levels: DEFAULT_QUANTILE_LEVELS.to_vec(),
            fallback_scale: Scale::Unknown,
            on_asset_error: AssetFailurePolicy::Skip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedAsset {
    pub asset: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioRun {
    pub result: PortfolioResult,
    pub skipped: Vec<SkippedAsset>,
}

pub fn compute_risk_score(
    asset_id: &str,
    prices: &Table,
    strategy: &StrategyConfig,
    forecaster: &dyn ForecastPort,
    settings: &RiskSettings,
) -> Result<RiskResult, RiskError> {
    if strategy.side == Side::Short {
        tracing::warn!(
            asset = asset_id,
            "short side requested; scoring with long-side drawdown"
        );
    }

    let series = normalize_prices(prices, &settings.normalize)?;
    let request = ForecastRequest {
        asset_id,
        series: &series,
        horizon: strategy.horizon(),
        quantile_levels: &settings.quantile_levels,
    };
    let forecast = forecaster.predict(&request)?;

    let extraction = ForecastFrame::parse(&forecast, &settings.forecast_columns)
        .extract(settings.quantile_level, settings.fallback_scale)
        .anchored(&series);
    if extraction.is_empty() {
        tracing::info!(
            asset = asset_id,
            "no usable forecast trajectory; scoring as zero risk"
        );
    }

    let drawdown = expected_max_drawdown(&extraction)?;
    let result = RiskResult::from_drawdown(drawdown);
    tracing::info!(
        asset = asset_id,
        score = result.score,
        drawdown = result.drawdown,
        "computed risk score"
    );
    Ok(result)
}

/// Score every asset and aggregate. Price and strategy keys must match.
///
/// An unavailable forecaster always aborts; other per-asset failures follow
/// `settings.on_asset_error`.
pub fn compute_portfolio_risk(
    prices: &BTreeMap<String, Table>,
    strategies: &BTreeMap<String, StrategyConfig>,
    forecaster: &dyn ForecastPort,
    settings: &RiskSettings,
) -> Result<PortfolioRun, RiskError> {
    check_asset_keys(prices.keys(), strategies.keys())?;

    let mut per_asset = BTreeMap::new();
    let mut skipped = Vec::new();

    for (asset, table) in prices {
        let strategy = &strategies[asset];
        match compute_risk_score(asset, table, strategy, forecaster, settings) {
            Ok(result) => {
                per_asset.insert(asset.clone(), result);
            }
            Err(e @ RiskError::ForecastUnavailable { .. }) => return Err(e),
            Err(e) => match settings.on_asset_error {
                AssetFailurePolicy::Abort => return Err(e),
                AssetFailurePolicy::Skip => {
                    tracing::warn!(asset = %asset, error = %e, "skipping asset");
                    skipped.push(SkippedAsset {
                        asset: asset.clone(),
                        reason: e.to_string(),
                    });
                }
            },
        }
    }

    let scored: BTreeMap<String, StrategyConfig> = strategies
        .iter()
        .filter(|(asset, _)| per_asset.contains_key(*asset))
        .map(|(asset, s)| (asset.clone(), s.clone()))
        .collect();
    let result = aggregate_portfolio(per_asset, &scored)?;

    tracing::info!(
        assets = result.per_asset.len(),
        skipped = skipped.len(),
        score = result.aggregate_score,
        "computed portfolio risk"
    );
    Ok(PortfolioRun { result, skipped })
}
