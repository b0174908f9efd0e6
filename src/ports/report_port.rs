//! Result output port.

use crate::domain::error::LedgersimError;
use crate::domain::result::ResultSeries;
use std::path::Path;

pub trait ReportPort {
    fn write(&self, results: &ResultSeries, output_path: &Path) -> Result<(), LedgersimError>;
}
