//! Precomputed forecasts read from disk in place of a live forecaster.
//!
//! Each asset's forecast lives in `<dir>/<asset>.csv`, in either the long or
//! the wide layout.

use crate::adapters::csv_adapter::read_table;
use crate::domain::error::RiskError;
use crate::domain::table::Table;
use crate::ports::forecast_port::{ForecastPort, ForecastRequest};
use std::fs;
use std::path::PathBuf;

#[derive(Debug)]
pub struct CsvForecastAdapter {
    base_path: PathBuf,
}

impl CsvForecastAdapter {
    /// Fails with [`RiskError::ForecastUnavailable`] when the directory is missing.
    pub fn open(base_path: PathBuf) -> Result<Self, RiskError> {
        if !base_path.is_dir() {
            return Err(RiskError::ForecastUnavailable {
                reason: format!("forecast directory {} not found", base_path.display()),
            });
        }
        Ok(Self { base_path })
    }

    fn csv_path(&self, asset_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", asset_id))
    }
}

impl ForecastPort for CsvForecastAdapter {
    fn predict(&self, request: &ForecastRequest<'_>) -> Result<Table, RiskError> {
        let path = self.csv_path(request.asset_id);
        let file = fs::File::open(&path).map_err(|e| {
            RiskError::data(format!("failed to read forecast {}: {}", path.display(), e))
        })?;
        let table = read_table(file, None)?;
        tracing::debug!(
            asset = request.asset_id,
            horizon = request.horizon,
            rows = table.row_count(),
            path = %path.display(),
            "loaded precomputed forecast"
        );
        Ok(table)
    }
}
