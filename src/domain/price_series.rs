//! Date-indexed close price table and per-date cross-sections.

use crate::domain::error::LedgersimError;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    instruments: Vec<String>,
    instrument_index: HashMap<String, usize>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<Option<f64>>>,
    date_index: HashMap<NaiveDate, usize>,
}

impl PriceSeries {
    /// Build a series from unordered rows. Each row carries one optional price per
    /// instrument, in the order of `instruments`.
    pub fn from_rows(
        instruments: Vec<String>,
        mut rows: Vec<(NaiveDate, Vec<Option<f64>>)>,
    ) -> Result<Self, LedgersimError> {
        let mut instrument_index = HashMap::with_capacity(instruments.len());
        for (i, instrument) in instruments.iter().enumerate() {
            if instrument_index.insert(instrument.clone(), i).is_some() {
                return Err(LedgersimError::DataSource {
                    reason: format!("duplicate instrument column {instrument}"),
                });
            }
        }

        rows.sort_by_key(|(date, _)| *date);

        let mut dates = Vec::with_capacity(rows.len());
        let mut prices = Vec::with_capacity(rows.len());
        let mut date_index = HashMap::with_capacity(rows.len());

        for (date, row) in rows {
            if row.len() != instruments.len() {
                return Err(LedgersimError::DataSource {
                    reason: format!(
                        "row for {date} has {} prices, expected {}",
                        row.len(),
                        instruments.len()
                    ),
                });
            }
            if let Some((i, bad)) = row
                .iter()
                .enumerate()
                .find_map(|(i, p)| p.filter(|v| !v.is_finite() || *v < 0.0).map(|v| (i, v)))
            {
                return Err(LedgersimError::DataSource {
                    reason: format!("invalid price {bad} for {} on {date}", instruments[i]),
                });
            }
            if date_index.insert(date, dates.len()).is_some() {
                return Err(LedgersimError::DataSource {
                    reason: format!("duplicate row for {date}"),
                });
            }
            dates.push(date);
            prices.push(row);
        }

        Ok(Self {
            instruments,
            instrument_index,
            dates,
            rows: prices,
            date_index,
        })
    }

    /// Drop every date on which at least one instrument has no price.
    pub fn drop_incomplete(self) -> Self {
        let (dates, rows): (Vec<_>, Vec<_>) = self
            .dates
            .into_iter()
            .zip(self.rows)
            .filter(|(_, row)| row.iter().all(Option::is_some))
            .unzip();
        let date_index = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        Self {
            instruments: self.instruments,
            instrument_index: self.instrument_index,
            dates,
            rows,
            date_index,
        }
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn price(&self, date: NaiveDate, instrument: &str) -> Option<f64> {
        self.slice(date)?.get(instrument)
    }

    pub fn slice(&self, date: NaiveDate) -> Option<PriceSlice<'_>> {
        self.date_index.get(&date).map(|&i| self.slice_at(i))
    }

    /// Cross-section for the `i`-th date. Panics if `i` is out of range.
    pub fn slice_at(&self, i: usize) -> PriceSlice<'_> {
        PriceSlice {
            date: self.dates[i],
            instruments: &self.instruments,
            instrument_index: &self.instrument_index,
            prices: &self.rows[i],
        }
    }
}

/// Read-only view of every instrument's price on one date.
#[derive(Debug, Clone, Copy)]
pub struct PriceSlice<'a> {
    date: NaiveDate,
    instruments: &'a [String],
    instrument_index: &'a HashMap<String, usize>,
    prices: &'a [Option<f64>],
}

impl<'a> PriceSlice<'a> {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn get(&self, instrument: &str) -> Option<f64> {
        self.instrument_index
            .get(instrument)
            .and_then(|&i| self.prices[i])
    }

    pub fn instruments(&self) -> &'a [String] {
        self.instruments
    }

    /// Instruments priced on this date, in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        let prices = self.prices;
        self.instruments
            .iter()
            .zip(prices.iter())
            .filter_map(|(instrument, price)| price.map(|p| (instrument.as_str(), p)))
    }
}
