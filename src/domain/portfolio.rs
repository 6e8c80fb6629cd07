//! Position-weighted aggregation of per-asset risk scores.

use crate::domain::error::RiskError;
use crate::domain::score::{RiskLevel, RiskResult};
use crate::domain::strategy::StrategyConfig;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioResult {
    pub aggregate_score: f64,
    pub per_asset: BTreeMap<String, RiskResult>,
}

impl PortfolioResult {
    pub fn level(&self) -> RiskLevel {
        RiskLevel::from_score(self.aggregate_score)
    }
}

/// Fails with the symmetric difference when the two id sets disagree.
pub fn check_asset_keys<'a, P, S>(price_ids: P, strategy_ids: S) -> Result<(), RiskError>
where
    P: IntoIterator<Item = &'a String>,
    S: IntoIterator<Item = &'a String>,
{
    let prices: BTreeSet<&String> = price_ids.into_iter().collect();
    let strategies: BTreeSet<&String> = strategy_ids.into_iter().collect();
    if prices == strategies {
        return Ok(());
    }
    let difference = prices
        .symmetric_difference(&strategies)
        .map(|s| (*s).clone())
        .collect();
    Err(RiskError::KeyMismatch { difference })
}

/// `sum(score * weight) / sum(weight)` with weight = `position_size_pct`.
///
/// A total weight of zero or less yields an aggregate of 0.0.
pub fn aggregate_portfolio(
    per_asset: BTreeMap<String, RiskResult>,
    strategies: &BTreeMap<String, StrategyConfig>,
) -> Result<PortfolioResult, RiskError> {
    check_asset_keys(per_asset.keys(), strategies.keys())?;

    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for (asset, result) in &per_asset {
        let weight = strategies[asset].position_size_pct;
        weighted_sum += result.score as f64 * weight;
        total_weight += weight;
    }

    let aggregate_score = if total_weight <= 0.0 {
        0.0
    } else {
        weighted_sum / total_weight
    };

    Ok(PortfolioResult {
        aggregate_score,
        per_asset,
    })
}
