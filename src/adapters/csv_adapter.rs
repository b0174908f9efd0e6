//! CSV close-price table adapter.
//!
//! Reads a wide table with a `date` column followed by one close-price column per
//! instrument:
//!
//! ```text
//! date,AAPL,MSFT
//! 2024-01-02,185.64,370.87
//! 2024-01-03,184.25,
//! ```
//!
//! Empty cells and `NA`/`NaN`/`null` are missing prices; any row with a missing
//! price for a requested instrument is dropped.

use crate::domain::error::LedgersimError;
use crate::domain::price_series::PriceSeries;
use crate::domain::universe::Universe;
use crate::ports::data_port::PriceSource;
use chrono::NaiveDate;
use std::fs::File;
use std::path::PathBuf;
use tracing::{debug, info};

pub struct CsvPriceSource {
    path: PathBuf,
}

impl CsvPriceSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn reader(&self) -> Result<csv::Reader<File>, LedgersimError> {
        csv::Reader::from_path(&self.path).map_err(|e| LedgersimError::DataSource {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })
    }

    fn header(rdr: &mut csv::Reader<File>) -> Result<Vec<String>, LedgersimError> {
        let headers = rdr.headers().map_err(|e| LedgersimError::DataSource {
            reason: format!("CSV header error: {}", e),
        })?;
        let columns: Vec<String> = headers.iter().map(|h| h.trim().to_uppercase()).collect();
        match columns.first() {
            Some(first) if first == "DATE" => Ok(columns),
            _ => Err(LedgersimError::DataSource {
                reason: "first column must be 'date'".into(),
            }),
        }
    }
}

fn parse_price(raw: &str, instrument: &str, date: NaiveDate) -> Result<Option<f64>, LedgersimError> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || ["na", "nan", "null"]
            .iter()
            .any(|m| trimmed.eq_ignore_ascii_case(m))
    {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|e| LedgersimError::DataSource {
            reason: format!("invalid price '{}' for {} on {}: {}", trimmed, instrument, date, e),
        })
}

impl PriceSource for CsvPriceSource {
    fn fetch_closes(
        &self,
        universe: &Universe,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, LedgersimError> {
        let mut rdr = self.reader()?;
        let columns = Self::header(&mut rdr)?;

        let column_index: Vec<usize> = universe
            .instruments()
            .iter()
            .map(|instrument| {
                columns
                    .iter()
                    .skip(1)
                    .position(|c| c == instrument)
                    .map(|i| i + 1)
                    .ok_or_else(|| LedgersimError::DataSource {
                        reason: format!(
                            "instrument {} not found in {}",
                            instrument,
                            self.path.display()
                        ),
                    })
            })
            .collect::<Result<_, _>>()?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| LedgersimError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(0).ok_or_else(|| LedgersimError::DataSource {
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                LedgersimError::DataSource {
                    reason: format!("invalid date '{}': {}", date_str, e),
                }
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            let prices = column_index
                .iter()
                .zip(universe.instruments())
                .map(|(&col, instrument)| parse_price(record.get(col).unwrap_or(""), instrument, date))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push((date, prices));
        }

        let raw = PriceSeries::from_rows(universe.instruments().to_vec(), rows)?;
        let raw_len = raw.len();
        let series = raw.drop_incomplete();
        if series.len() < raw_len {
            info!(
                dropped = raw_len - series.len(),
                kept = series.len(),
                "dropped dates with missing prices"
            );
        }
        debug!(path = %self.path.display(), rows = series.len(), "loaded price table");
        Ok(series)
    }

    fn list_instruments(&self) -> Result<Vec<String>, LedgersimError> {
        let mut rdr = self.reader()?;
        let columns = Self::header(&mut rdr)?;
        Ok(columns.into_iter().skip(1).collect())
    }
}
