#![allow(dead_code)]

use chrono::NaiveDate;
use ledgersim::domain::backtest::BacktestConfig;
use ledgersim::domain::cost_model::FinancingBasis;
use ledgersim::domain::error::LedgersimError;
use ledgersim::domain::ledger::{OrderRejected, SellQuantity};
use ledgersim::domain::policy::{Orders, Policy};
use ledgersim::domain::price_series::{PriceSeries, PriceSlice};
use ledgersim::domain::result::ResultSeries;
use ledgersim::domain::universe::Universe;
use ledgersim::ports::data_port::PriceSource;
use ledgersim::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Series with one column per instrument; `rows` are `(date, prices)` in column order.
pub fn make_series(instruments: &[&str], rows: Vec<(NaiveDate, Vec<f64>)>) -> PriceSeries {
    PriceSeries::from_rows(
        instruments.iter().map(|s| s.to_string()).collect(),
        rows.into_iter()
            .map(|(d, prices)| (d, prices.into_iter().map(Some).collect()))
            .collect(),
    )
    .unwrap()
}

/// `count` consecutive days starting at `start`, each instrument rising by `step`.
pub fn generate_series(
    instruments: &[&str],
    start: NaiveDate,
    count: usize,
    start_price: f64,
    step: f64,
) -> PriceSeries {
    let rows = (0..count)
        .map(|i| {
            let d = start + chrono::Duration::days(i as i64);
            let prices = instruments
                .iter()
                .enumerate()
                .map(|(k, _)| start_price * (k + 1) as f64 + step * i as f64)
                .collect();
            (d, prices)
        })
        .collect();
    make_series(instruments, rows)
}

pub fn sample_config(universe: &[&str]) -> BacktestConfig {
    BacktestConfig {
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        initial_cash: 10_000.0,
        universe: universe.iter().map(|s| s.to_string()).collect(),
        execution_cost_bps: 10.0,
        financing_cost: 0.0,
        financing_basis: FinancingBasis::Quantity,
        risk_free_rate: 0.0,
    }
}

#[derive(Debug, Clone)]
pub enum Order {
    Buy(&'static str, f64),
    Sell(&'static str, f64),
    SellAll(&'static str),
    Liquidate(&'static str),
}

/// Replays a fixed order list per date and keeps every outcome.
#[derive(Default)]
pub struct ScriptedPolicy {
    pub script: HashMap<NaiveDate, Vec<Order>>,
    pub outcomes: Vec<(NaiveDate, Result<f64, OrderRejected>)>,
    pub seen_dates: Vec<NaiveDate>,
}

impl ScriptedPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, d: NaiveDate, orders: Vec<Order>) -> Self {
        self.script.entry(d).or_default().extend(orders);
        self
    }

    pub fn rejections(&self) -> Vec<&OrderRejected> {
        self.outcomes
            .iter()
            .filter_map(|(_, r)| r.as_ref().err())
            .collect()
    }
}

impl Policy for ScriptedPolicy {
    fn on_period(&mut self, date: NaiveDate, _prices: &PriceSlice<'_>, orders: &mut Orders<'_>) {
        self.seen_dates.push(date);
        let Some(script) = self.script.get(&date).cloned() else {
            return;
        };
        for order in script {
            let result = match order {
                Order::Buy(i, q) => orders.buy(i, q),
                Order::Sell(i, q) => orders.sell(i, SellQuantity::Units(q)),
                Order::SellAll(i) => orders.sell(i, SellQuantity::All),
                Order::Liquidate(i) => orders.liquidate(i),
            };
            self.outcomes.push((date, result.map(|fill| fill.cash_delta)));
        }
    }
}

pub struct MockPriceSource {
    pub series: Option<PriceSeries>,
    pub error: Option<String>,
}

impl MockPriceSource {
    pub fn new(series: PriceSeries) -> Self {
        Self {
            series: Some(series),
            error: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            series: None,
            error: Some(reason.to_string()),
        }
    }
}

impl PriceSource for MockPriceSource {
    fn fetch_closes(
        &self,
        _universe: &Universe,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<PriceSeries, LedgersimError> {
        if let Some(reason) = &self.error {
            return Err(LedgersimError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self.series.clone().unwrap_or_else(|| make_series(&[], vec![])))
    }

    fn list_instruments(&self) -> Result<Vec<String>, LedgersimError> {
        Ok(self
            .series
            .as_ref()
            .map(|s| s.instruments().to_vec())
            .unwrap_or_default())
    }
}

/// Captures written results instead of touching the filesystem.
#[derive(Default)]
pub struct CapturingReport {
    pub written: RefCell<Vec<(PathBuf, ResultSeries)>>,
}

impl ReportPort for CapturingReport {
    fn write(&self, results: &ResultSeries, output_path: &Path) -> Result<(), LedgersimError> {
        self.written
            .borrow_mut()
            .push((output_path.to_path_buf(), results.clone()));
        Ok(())
    }
}
