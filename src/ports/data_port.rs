//! Historical price access port.

use crate::domain::error::LedgersimError;
use crate::domain::price_series::PriceSeries;
use crate::domain::universe::Universe;
use chrono::NaiveDate;

pub trait PriceSource {
    /// Close prices for every instrument in `universe` between `start_date` and
    /// `end_date` inclusive. Dates where any instrument lacks a price are dropped.
    fn fetch_closes(
        &self,
        universe: &Universe,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, LedgersimError>;

    fn list_instruments(&self) -> Result<Vec<String>, LedgersimError>;
}
