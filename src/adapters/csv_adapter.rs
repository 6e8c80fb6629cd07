//! CSV file adapters: price history in, canonical series out.

use crate::domain::error::RiskError;
use crate::domain::series::CanonicalSeries;
use crate::domain::table::{Column, RowIndex, Table};
use crate::ports::data_port::PriceDataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Float when every non-empty cell is numeric (empty cells become NaN),
/// datetime when every cell is a timestamp, text otherwise.
fn infer_column(cells: Vec<String>) -> Column {
    let numeric: Option<Vec<f64>> = cells
        .iter()
        .map(|c| {
            let c = c.trim();
            if c.is_empty() {
                Some(f64::NAN)
            } else {
                c.parse::<f64>().ok()
            }
        })
        .collect();
    if let Some(values) = numeric {
        return Column::Float(values);
    }
    let stamps: Option<Vec<NaiveDateTime>> = cells.iter().map(|c| parse_datetime(c)).collect();
    match stamps {
        Some(values) => Column::Datetime(values),
        None => Column::Text(cells),
    }
}

fn infer_index(cells: Vec<String>) -> RowIndex {
    let stamps: Option<Vec<NaiveDateTime>> = cells.iter().map(|c| parse_datetime(c)).collect();
    match stamps {
        Some(values) => RowIndex::Datetime(values),
        None => RowIndex::Text(cells),
    }
}

/// Read a CSV table. With `index_column`, that column becomes the row index.
pub fn read_table<R: io::Read>(reader: R, index_column: Option<&str>) -> Result<Table, RiskError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| RiskError::data(format!("CSV header error: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for result in rdr.records() {
        let record = result.map_err(|e| RiskError::data(format!("CSV parse error: {}", e)))?;
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(record.get(i).unwrap_or("").to_string());
        }
    }

    let index_pos = match index_column {
        Some(name) => Some(headers.iter().position(|h| h == name).ok_or_else(|| {
            RiskError::data(format!("index column '{}' not found", name))
        })?),
        None => None,
    };

    let rows = cells.first().map(Vec::len).unwrap_or(0);
    let mut index = RowIndex::Range(rows);
    let mut columns = Vec::with_capacity(headers.len());
    for (i, (name, column)) in headers.into_iter().zip(cells).enumerate() {
        if Some(i) == index_pos {
            index = infer_index(column);
        } else {
            columns.push((name, infer_column(column)));
        }
    }

    columns
        .into_iter()
        .try_fold(Table::new(index), |table, (name, column)| {
            table.with_column(name, column)
        })
}

/// Price history for many symbols in one CSV file, e.g.
/// `date,symbol,open,high,low,close`.
pub struct CsvPriceAdapter {
    table: Table,
    symbol_column: String,
}

impl CsvPriceAdapter {
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        index_column: &str,
        symbol_column: &str,
    ) -> Result<Self, RiskError> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|e| {
            RiskError::data(format!("failed to read {}: {}", path.display(), e))
        })?;
        let table = read_table(file, Some(index_column))?;
        Ok(Self::from_table(table, symbol_column))
    }

    pub fn from_table(table: Table, symbol_column: &str) -> Self {
        Self {
            table,
            symbol_column: symbol_column.to_string(),
        }
    }

    fn symbol_cells(&self) -> Result<&Column, RiskError> {
        self.table.column(&self.symbol_column).ok_or_else(|| {
            RiskError::data(format!("symbol column '{}' not found", self.symbol_column))
        })
    }
}

impl PriceDataPort for CsvPriceAdapter {
    fn fetch_prices(&self, symbol: &str) -> Result<Table, RiskError> {
        let symbols = self.symbol_cells()?;
        let rows: Vec<usize> = (0..self.table.row_count())
            .filter(|&r| symbols.label(r) == symbol)
            .collect();
        if rows.is_empty() {
            return Err(RiskError::data(format!("no price data for symbol '{}'", symbol)));
        }
        self.table.select_rows(&rows)
    }

    fn list_symbols(&self) -> Result<Vec<String>, RiskError> {
        let symbols = self.symbol_cells()?;
        let unique: BTreeSet<String> = (0..self.table.row_count())
            .map(|r| symbols.label(r))
            .collect();
        Ok(unique.into_iter().collect())
    }
}

/// Write the canonical series as `id,timestamp,target` rows.
pub fn write_canonical_series<W: io::Write>(
    writer: W,
    series: &CanonicalSeries,
) -> Result<(), RiskError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let to_data = |e: csv::Error| RiskError::data(format!("CSV write error: {}", e));
    wtr.write_record(["id", "timestamp", "target"]).map_err(to_data)?;
    for point in series.points() {
        wtr.write_record([
            point.series_id.clone(),
            point.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            point.value.to_string(),
        ])
        .map_err(to_data)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_canonical_series_file(path: &Path, series: &CanonicalSeries) -> Result<(), RiskError> {
    let file = fs::File::create(path).map_err(|e| {
        RiskError::data(format!("failed to create {}: {}", path.display(), e))
    })?;
    write_canonical_series(file, series)
}
