//! Forecasting collaborator port.

use crate::domain::error::RiskError;
use crate::domain::series::CanonicalSeries;
use crate::domain::table::Table;

/// What the forecaster is asked for: `horizon` steps ahead of `series`, at
/// each of `quantile_levels`.
#[derive(Debug, Clone, Copy)]
pub struct ForecastRequest<'a> {
    pub asset_id: &'a str,
    pub series: &'a CanonicalSeries,
    pub horizon: usize,
    pub quantile_levels: &'a [f64],
}

/// Implementations answer with a long- or wide-format forecast table.
/// A collaborator that cannot be reached or initialised reports
/// [`RiskError::ForecastUnavailable`].
pub trait ForecastPort {
    fn predict(&self, request: &ForecastRequest<'_>) -> Result<Table, RiskError>;
}
