#![allow(dead_code)]

use blackguard::domain::error::RiskError;
use blackguard::domain::strategy::{Side, StrategyConfig};
use blackguard::domain::table::{Column, RowIndex, Table};
use blackguard::ports::forecast_port::{ForecastPort, ForecastRequest};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cell::RefCell;
use std::collections::HashMap;

/// A horizon and level set the pipeline asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub asset_id: String,
    pub horizon: usize,
    pub quantile_levels: Vec<f64>,
    pub series_len: usize,
}

pub struct MockForecastPort {
    pub tables: HashMap<String, Table>,
    pub errors: HashMap<String, String>,
    pub unavailable: Option<String>,
    pub requests: RefCell<Vec<RecordedRequest>>,
}

impl MockForecastPort {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            errors: HashMap::new(),
            unavailable: None,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_table(mut self, asset: &str, table: Table) -> Self {
        self.tables.insert(asset.to_string(), table);
        self
    }

    pub fn with_error(mut self, asset: &str, reason: &str) -> Self {
        self.errors.insert(asset.to_string(), reason.to_string());
        self
    }

    pub fn unavailable(mut self, reason: &str) -> Self {
        self.unavailable = Some(reason.to_string());
        self
    }
}

impl ForecastPort for MockForecastPort {
    fn predict(&self, request: &ForecastRequest<'_>) -> Result<Table, RiskError> {
        self.requests.borrow_mut().push(RecordedRequest {
            asset_id: request.asset_id.to_string(),
            horizon: request.horizon,
            quantile_levels: request.quantile_levels.to_vec(),
            series_len: request.series.len(),
        });
        if let Some(reason) = &self.unavailable {
            return Err(RiskError::ForecastUnavailable {
                reason: reason.clone(),
            });
        }
        if let Some(reason) = self.errors.get(request.asset_id) {
            return Err(RiskError::data(reason.clone()));
        }
        self.tables
            .get(request.asset_id)
            .cloned()
            .ok_or_else(|| RiskError::data(format!("no forecast for {}", request.asset_id)))
    }
}

pub fn ts(day: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::days(day)
}

/// Closing prices on consecutive days from 2024-01-01.
pub fn price_table(closes: &[f64]) -> Table {
    let dates = (0..closes.len() as i64).map(ts).collect();
    Table::new(RowIndex::Datetime(dates))
        .with_column("close", Column::Float(closes.to_vec()))
        .unwrap()
}

pub fn logs(prices: &[f64]) -> Vec<f64> {
    prices.iter().map(|p| p.ln()).collect()
}

/// Wide forecast without id or timestamp columns.
pub fn wide_forecast(columns: &[(&str, Vec<f64>)]) -> Table {
    Table::from_columns(
        columns
            .iter()
            .map(|(label, values)| (label.to_string(), Column::Float(values.clone())))
            .collect(),
    )
    .unwrap()
}

/// Long forecast from `(id, day, quantile, value)` rows.
pub fn long_forecast(rows: &[(&str, i64, f64, f64)]) -> Table {
    Table::from_columns(vec![
        (
            "id".into(),
            Column::Text(rows.iter().map(|r| r.0.to_string()).collect()),
        ),
        (
            "timestamp".into(),
            Column::Datetime(rows.iter().map(|r| ts(r.1)).collect()),
        ),
        (
            "quantile".into(),
            Column::Float(rows.iter().map(|r| r.2).collect()),
        ),
        (
            "target".into(),
            Column::Float(rows.iter().map(|r| r.3).collect()),
        ),
    ])
    .unwrap()
}

pub fn make_strategy(symbol: &str, weight: f64) -> StrategyConfig {
    StrategyConfig {
        entry_price: 100.0,
        take_profit_pct: 0.1,
        stop_loss_pct: 0.05,
        holding_period_days: 5,
        position_size_pct: weight,
        symbol: Some(symbol.to_string()),
        side: Side::Long,
    }
}
