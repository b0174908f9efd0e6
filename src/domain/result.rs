//! Per-period valuation records produced by a run.

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodRecord {
    pub date: NaiveDate,
    /// portfolio_value + cash after the period settled.
    pub total_value: f64,
    /// Mark-to-market value of all positions at the period's prices.
    pub portfolio_value: f64,
    /// At least one order was accepted during the period.
    pub rebalanced: bool,
}

impl PeriodRecord {
    pub fn cash(&self) -> f64 {
        self.total_value - self.portfolio_value
    }
}

/// Date-ordered, append-only sequence of [`PeriodRecord`]s.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSeries {
    records: Vec<PeriodRecord>,
}

impl ResultSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Dates must be strictly increasing.
    pub(crate) fn push(&mut self, record: PeriodRecord) {
        debug_assert!(
            self.records.last().is_none_or(|last| last.date < record.date),
            "records must be appended in date order"
        );
        self.records.push(record);
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }

    pub fn records(&self) -> &[PeriodRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PeriodRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first(&self) -> Option<&PeriodRecord> {
        self.records.first()
    }

    pub fn last(&self) -> Option<&PeriodRecord> {
        self.records.last()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&PeriodRecord> {
        self.records
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| &self.records[i])
    }

    pub fn rebalance_count(&self) -> usize {
        self.records.iter().filter(|r| r.rebalanced).count()
    }
}

impl<'a> IntoIterator for &'a ResultSeries {
    type Item = &'a PeriodRecord;
    type IntoIter = std::slice::Iter<'a, PeriodRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
