//! Column-oriented table shared by price history and forecast results.
//!
//! Columns keep their insertion order; the forecast extractor relies on it
//! for leftmost-first tie-breaking.

use crate::domain::error::RiskError;
use chrono::NaiveDateTime;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float(Vec<f64>),
    Text(Vec<String>),
    Datetime(Vec<NaiveDateTime>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Text(v) => v.len(),
            Column::Datetime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> &'static str {
        match self {
            Column::Float(_) => "float",
            Column::Text(_) => "text",
            Column::Datetime(_) => "datetime",
        }
    }

    /// Numeric value of a cell. Text cells are parsed; datetime cells have none.
    pub fn as_f64(&self, row: usize) -> Option<f64> {
        match self {
            Column::Float(v) => v.get(row).copied(),
            Column::Text(v) => v.get(row).and_then(|s| s.trim().parse().ok()),
            Column::Datetime(_) => None,
        }
    }

    /// String form of a cell, used for series ids.
    pub fn label(&self, row: usize) -> String {
        match self {
            Column::Float(v) => v.get(row).map(|x| x.to_string()).unwrap_or_default(),
            Column::Text(v) => v.get(row).cloned().unwrap_or_default(),
            Column::Datetime(v) => v.get(row).map(|t| t.to_string()).unwrap_or_default(),
        }
    }

    /// Order of two cells. Both rows must be below `len()`.
    pub fn compare_rows(&self, a: usize, b: usize) -> Ordering {
        match self {
            Column::Float(v) => v[a].total_cmp(&v[b]),
            Column::Text(v) => v[a].cmp(&v[b]),
            Column::Datetime(v) => v[a].cmp(&v[b]),
        }
    }

    fn select(&self, rows: &[usize]) -> Column {
        match self {
            Column::Float(v) => Column::Float(rows.iter().map(|&i| v[i]).collect()),
            Column::Text(v) => Column::Text(rows.iter().map(|&i| v[i].clone()).collect()),
            Column::Datetime(v) => Column::Datetime(rows.iter().map(|&i| v[i]).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowIndex {
    Datetime(Vec<NaiveDateTime>),
    Text(Vec<String>),
    Range(usize),
}

impl RowIndex {
    pub fn len(&self) -> usize {
        match self {
            RowIndex::Datetime(v) => v.len(),
            RowIndex::Text(v) => v.len(),
            RowIndex::Range(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> &'static str {
        match self {
            RowIndex::Datetime(_) => "datetime",
            RowIndex::Text(_) => "text",
            RowIndex::Range(_) => "range",
        }
    }

    fn select(&self, rows: &[usize]) -> RowIndex {
        match self {
            RowIndex::Datetime(v) => RowIndex::Datetime(rows.iter().map(|&i| v[i]).collect()),
            RowIndex::Text(v) => RowIndex::Text(rows.iter().map(|&i| v[i].clone()).collect()),
            RowIndex::Range(_) => RowIndex::Range(rows.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    index: RowIndex,
    columns: Vec<(String, Column)>,
}

impl Table {
    pub fn new(index: RowIndex) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Table with a positional index sized by its first column.
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self, RiskError> {
        let rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        columns
            .into_iter()
            .try_fold(Table::new(RowIndex::Range(rows)), |table, (name, column)| {
                table.with_column(name, column)
            })
    }

    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self, RiskError> {
        let name = name.into();
        if column.len() != self.index.len() {
            return Err(RiskError::validation(format!(
                "column '{}' has {} rows, index has {}",
                name,
                column.len(),
                self.index.len()
            )));
        }
        if self.has_column(&name) {
            return Err(RiskError::validation(format!("duplicate column '{}'", name)));
        }
        self.columns.push((name, column));
        Ok(self)
    }

    pub fn index(&self) -> &RowIndex {
        &self.index
    }

    pub fn row_count(&self) -> usize {
        self.index.len()
    }

    pub fn columns(&self) -> &[(String, Column)] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Rows in the given order. Any row at or past `row_count()` is an error.
    pub fn select_rows(&self, rows: &[usize]) -> Result<Table, RiskError> {
        let row_count = self.row_count();
        if let Some(&row) = rows.iter().find(|&&r| r >= row_count) {
            return Err(RiskError::validation(format!(
                "row {} out of range, table has {} rows",
                row, row_count
            )));
        }
        Ok(Table {
            index: self.index.select(rows),
            columns: self
                .columns
                .iter()
                .map(|(n, c)| (n.clone(), c.select(rows)))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn with_column_rejects_length_mismatch() {
        let err = Table::new(RowIndex::Range(2))
            .with_column("close", Column::Float(vec![1.0]))
            .unwrap_err();
        assert!(matches!(err, RiskError::Validation { .. }));
    }

    #[test]
    fn with_column_rejects_duplicate_label() {
        let err = Table::new(RowIndex::Range(1))
            .with_column("close", Column::Float(vec![1.0]))
            .unwrap()
            .with_column("close", Column::Float(vec![2.0]))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate column"));
    }

    #[test]
    fn from_columns_preserves_order() {
        let table = Table::from_columns(vec![
            ("0.9".into(), Column::Float(vec![1.0, 2.0])),
            ("0.1".into(), Column::Float(vec![3.0, 4.0])),
        ])
        .unwrap();
        assert_eq!(table.column_names(), vec!["0.9", "0.1"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.index(), &RowIndex::Range(2));
    }

    #[test]
    fn select_rows_keeps_index_and_columns_aligned() {
        let table = Table::new(RowIndex::Datetime(vec![ts(1), ts(2), ts(3)]))
            .with_column("symbol", Column::Text(vec!["A".into(), "B".into(), "A".into()]))
            .unwrap()
            .with_column("close", Column::Float(vec![10.0, 20.0, 30.0]))
            .unwrap();

        let selected = table.select_rows(&[0, 2]).unwrap();
        assert_eq!(selected.index(), &RowIndex::Datetime(vec![ts(1), ts(3)]));
        assert_eq!(
            selected.column("close"),
            Some(&Column::Float(vec![10.0, 30.0]))
        );
    }

    #[test]
    fn select_rows_rejects_out_of_range_row() {
        let table = Table::new(RowIndex::Range(2))
            .with_column("close", Column::Float(vec![10.0, 20.0]))
            .unwrap();

        let err = table.select_rows(&[1, 2]).unwrap_err();
        assert!(matches!(err, RiskError::Validation { .. }));
        assert!(err.to_string().contains("row 2"));
        assert_eq!(table.select_rows(&[]).unwrap().row_count(), 0);
    }

    #[test]
    fn text_cells_parse_as_numbers() {
        let col = Column::Text(vec![" 0.5 ".into(), "abc".into()]);
        assert_eq!(col.as_f64(0), Some(0.5));
        assert_eq!(col.as_f64(1), None);
    }

    #[test]
    fn float_labels_drop_trailing_zero() {
        let col = Column::Float(vec![1.0, 2.5]);
        assert_eq!(col.label(0), "1");
        assert_eq!(col.label(1), "2.5");
    }
}
