//! Strategy definitions from a JSON array of objects.
//!
//! ```json
//! [{"symbol": "VNM", "entry_price": 70000, "take_profit_pct": 0.1,
//!   "stop_loss_pct": 0.05, "holding_period_days": 15, "position_size_pct": 0.6}]
//! ```

use crate::domain::error::RiskError;
use crate::domain::strategy::StrategyConfig;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

#[derive(Debug)]
pub struct JsonStrategyAdapter {
    entries: Vec<StrategyConfig>,
}

impl JsonStrategyAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RiskError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RiskError::data(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_str(&content).map_err(|e| match e {
            RiskError::Data { reason } => RiskError::ConfigParse {
                file: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, RiskError> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| RiskError::data(format!("invalid JSON: {}", e)))?;
        let items = value
            .as_array()
            .ok_or_else(|| RiskError::data("expected a JSON array of strategies"))?;

        let entries = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let map = object_to_map(item)
                    .map_err(|reason| RiskError::data(format!("strategy #{}: {}", i, reason)))?;
                StrategyConfig::from_map(&map)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[StrategyConfig] {
        &self.entries
    }

    /// Strategies keyed by symbol. Every entry needs a unique symbol.
    pub fn by_symbol(&self) -> Result<BTreeMap<String, StrategyConfig>, RiskError> {
        let mut keyed = BTreeMap::new();
        for (i, strategy) in self.entries.iter().enumerate() {
            let symbol = strategy.symbol.clone().ok_or_else(|| RiskError::ConfigMissing {
                section: format!("strategy #{}", i),
                key: "symbol".to_string(),
            })?;
            if keyed.insert(symbol.clone(), strategy.clone()).is_some() {
                return Err(RiskError::ConfigInvalid {
                    section: format!("strategy #{}", i),
                    key: "symbol".to_string(),
                    reason: format!("duplicate symbol '{}'", symbol),
                });
            }
        }
        Ok(keyed)
    }
}

fn object_to_map(item: &Value) -> Result<HashMap<String, String>, String> {
    let object = item.as_object().ok_or("expected an object")?;
    object
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => return Err(format!("'{}' is null", key)),
                _ => return Err(format!("'{}' must be a scalar", key)),
            };
            Ok((key.clone(), text))
        })
        .collect()
}
