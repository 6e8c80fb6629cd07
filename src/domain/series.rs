//! Price history normalization into canonical (id, timestamp, log-price) rows.

use crate::domain::error::RiskError;
use crate::domain::table::{RowIndex, Table};
use chrono::NaiveDateTime;
use std::collections::HashMap;

pub const DEFAULT_PRICE_COLUMN: &str = "close";
pub const DEFAULT_GROUP_COLUMN: &str = "symbol";
pub const DEFAULT_SERIES_ID: &str = "series";

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    pub price_column: String,
    pub group_column: String,
    /// Id assigned to every row when the table has no group column.
    pub default_series_id: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            price_column: DEFAULT_PRICE_COLUMN.to_string(),
            group_column: DEFAULT_GROUP_COLUMN.to_string(),
            default_series_id: DEFAULT_SERIES_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalPoint {
    pub series_id: String,
    pub timestamp: NaiveDateTime,
    /// Natural log of the price.
    pub value: f64,
}

/// Points grouped by series id (first-appearance order), each group sorted by
/// timestamp with no duplicates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalSeries {
    points: Vec<CanonicalPoint>,
}

impl CanonicalSeries {
    pub fn points(&self) -> &[CanonicalPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn series_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for p in &self.points {
            if ids.last() != Some(&p.series_id.as_str()) {
                ids.push(&p.series_id);
            }
        }
        ids
    }

    pub fn values_for(&self, series_id: &str) -> Vec<f64> {
        self.points
            .iter()
            .filter(|p| p.series_id == series_id)
            .map(|p| p.value)
            .collect()
    }
}

pub fn normalize_prices(
    table: &Table,
    options: &NormalizeOptions,
) -> Result<CanonicalSeries, RiskError> {
    let timestamps = match table.index() {
        RowIndex::Datetime(ts) => ts,
        other => {
            return Err(RiskError::validation(format!(
                "row index must be datetime (got {})",
                other.dtype()
            )));
        }
    };

    let prices = table.column(&options.price_column).ok_or_else(|| {
        RiskError::validation(format!(
            "price column '{}' not found; available columns: [{}]",
            options.price_column,
            table.column_names().join(", ")
        ))
    })?;

    let mut log_prices = Vec::with_capacity(table.row_count());
    for row in 0..table.row_count() {
        let price = prices.as_f64(row).ok_or_else(|| {
            RiskError::validation(format!(
                "price column '{}' has a non-numeric value at row {}",
                options.price_column, row
            ))
        })?;
        if !(price > 0.0) || !price.is_finite() {
            return Err(RiskError::validation(format!(
                "price column '{}' contains non-positive value {} at {}; \
                 all prices must be positive for the log transform",
                options.price_column, price, timestamps[row]
            )));
        }
        log_prices.push(price.ln());
    }

    let group = table.column(&options.group_column);
    let series_id = |row: usize| match group {
        Some(col) => col.label(row),
        None => options.default_series_id.clone(),
    };

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for row in 0..table.row_count() {
        let id = series_id(row);
        groups
            .entry(id.clone())
            .or_insert_with(|| {
                order.push(id);
                Vec::new()
            })
            .push(row);
    }

    let mut points = Vec::with_capacity(table.row_count());
    for id in order {
        let mut rows = groups.remove(&id).unwrap_or_default();
        rows.sort_by_key(|&r| timestamps[r]);
        for pair in rows.windows(2) {
            if timestamps[pair[0]] == timestamps[pair[1]] {
                return Err(RiskError::validation(format!(
                    "duplicate timestamp {} in series '{}'",
                    timestamps[pair[0]], id
                )));
            }
        }
        points.extend(rows.into_iter().map(|r| CanonicalPoint {
            series_id: id.clone(),
            timestamp: timestamps[r],
            value: log_prices[r],
        }));
    }

    tracing::debug!(
        rows = points.len(),
        price_column = %options.price_column,
        "normalized price history"
    );
    Ok(CanonicalSeries { points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::Column;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn price_table(days: &[u32], closes: &[f64]) -> Table {
        Table::new(RowIndex::Datetime(days.iter().map(|&d| ts(d)).collect()))
            .with_column("close", Column::Float(closes.to_vec()))
            .unwrap()
    }

    #[test]
    fn single_series_uses_default_id_and_log_values() {
        let table = price_table(&[1, 2, 3], &[100.0, 110.0, 105.0]);
        let series = normalize_prices(&table, &NormalizeOptions::default()).unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.series_ids(), vec!["series"]);
        let p = &series.points()[1];
        assert_eq!(p.timestamp, ts(2));
        assert!((p.value - 110.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn group_column_partitions_series() {
        let table = Table::new(RowIndex::Datetime(vec![ts(1), ts(1), ts(2), ts(2)]))
            .with_column(
                "symbol",
                Column::Text(vec!["VNM".into(), "FPT".into(), "VNM".into(), "FPT".into()]),
            )
            .unwrap()
            .with_column("close", Column::Float(vec![10.0, 20.0, 11.0, 21.0]))
            .unwrap();

        let series = normalize_prices(&table, &NormalizeOptions::default()).unwrap();
        assert_eq!(series.series_ids(), vec!["VNM", "FPT"]);
        assert_eq!(series.values_for("FPT"), vec![20.0_f64.ln(), 21.0_f64.ln()]);
    }

    #[test]
    fn output_is_sorted_by_timestamp() {
        let table = price_table(&[3, 1, 2], &[30.0, 10.0, 20.0]);
        let series = normalize_prices(&table, &NormalizeOptions::default()).unwrap();
        let stamps: Vec<_> = series.points().iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![ts(1), ts(2), ts(3)]);
        assert_eq!(
            series.values_for("series"),
            vec![10.0_f64.ln(), 20.0_f64.ln(), 30.0_f64.ln()]
        );
    }

    #[test]
    fn rejects_non_datetime_index() {
        let table = Table::new(RowIndex::Range(2))
            .with_column("close", Column::Float(vec![1.0, 2.0]))
            .unwrap();
        let err = normalize_prices(&table, &NormalizeOptions::default()).unwrap_err();
        assert!(err.to_string().contains("must be datetime (got range)"));
    }

    #[test]
    fn rejects_missing_price_column() {
        let table = Table::new(RowIndex::Datetime(vec![ts(1)]))
            .with_column("open", Column::Float(vec![1.0]))
            .unwrap();
        let err = normalize_prices(&table, &NormalizeOptions::default()).unwrap_err();
        assert!(matches!(err, RiskError::Validation { .. }));
        assert!(err.to_string().contains("'close' not found"));
    }

    #[test]
    fn rejects_non_positive_prices() {
        for bad in [0.0, -5.0, f64::NAN] {
            let table = price_table(&[1, 2], &[100.0, bad]);
            let err = normalize_prices(&table, &NormalizeOptions::default()).unwrap_err();
            assert!(matches!(err, RiskError::Validation { .. }), "price {bad}");
        }
    }

    #[test]
    fn rejects_duplicate_timestamps_within_series() {
        let table = price_table(&[1, 1], &[100.0, 101.0]);
        let err = normalize_prices(&table, &NormalizeOptions::default()).unwrap_err();
        assert!(err.to_string().contains("duplicate timestamp"));
    }

    #[test]
    fn custom_price_column() {
        let table = Table::new(RowIndex::Datetime(vec![ts(1)]))
            .with_column("adj_close", Column::Float(vec![std::f64::consts::E]))
            .unwrap();
        let options = NormalizeOptions {
            price_column: "adj_close".into(),
            ..NormalizeOptions::default()
        };
        let series = normalize_prices(&table, &options).unwrap();
        assert!((series.points()[0].value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_table_yields_empty_series() {
        let table = price_table(&[], &[]);
        let series = normalize_prices(&table, &NormalizeOptions::default()).unwrap();
        assert!(series.is_empty());
        assert!(series.series_ids().is_empty());
    }
}
