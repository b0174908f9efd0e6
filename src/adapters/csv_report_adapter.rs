//! CSV writer for a run's per-period records.

use crate::domain::error::LedgersimError;
use crate::domain::result::ResultSeries;
use crate::ports::report_port::ReportPort;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Write `date,total_value,portfolio_value,rebalanced` rows to any writer.
    pub fn write_to<W: Write>(&self, results: &ResultSeries, writer: W) -> Result<(), LedgersimError> {
        let mut wtr = csv::Writer::from_writer(writer);
        for record in results {
            wtr.serialize(record).map_err(|e| LedgersimError::DataSource {
                reason: format!("failed to serialize record for {}: {}", record.date, e),
            })?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, results: &ResultSeries, output_path: &Path) -> Result<(), LedgersimError> {
        let file = std::fs::File::create(output_path)?;
        self.write_to(results, file)
    }
}
