//! Price history access port.

use crate::domain::error::RiskError;
use crate::domain::table::Table;

pub trait PriceDataPort {
    /// Price table for one asset, indexed by bar timestamp.
    fn fetch_prices(&self, symbol: &str) -> Result<Table, RiskError>;

    fn list_symbols(&self) -> Result<Vec<String>, RiskError>;
}
