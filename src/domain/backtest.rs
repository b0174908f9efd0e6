//! Backtest parameters and the one-call run helper.

use chrono::NaiveDate;

use super::cost_model::{CostModel, FinancingBasis};
use super::engine::SimulationEngine;
use super::error::LedgersimError;
use super::ledger::Ledger;
use super::metrics::Metrics;
use super::policy::Policy;
use super::price_series::PriceSeries;
use super::result::ResultSeries;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_cash: f64,
    pub universe: Vec<String>,
    pub execution_cost_bps: f64,
    pub financing_cost: f64,
    pub financing_basis: FinancingBasis,
    pub risk_free_rate: f64,
}

impl BacktestConfig {
    pub fn cost_model(&self) -> Result<CostModel, LedgersimError> {
        Ok(CostModel::new(self.execution_cost_bps, self.financing_cost)?
            .with_financing_basis(self.financing_basis))
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub results: ResultSeries,
    pub ledger: Ledger,
    pub metrics: Metrics,
}

/// Run `policy` over `prices` with the costs and cash from `config`.
pub fn run_backtest<P: Policy + ?Sized>(
    prices: PriceSeries,
    config: &BacktestConfig,
    policy: &mut P,
) -> Result<BacktestResult, LedgersimError> {
    let mut engine = SimulationEngine::new(prices, config.initial_cash, config.cost_model()?);
    engine.run(policy)?;

    let ledger = engine.ledger().clone();
    let results = engine.into_results();
    let metrics = Metrics::compute(&results, config.initial_cash, config.risk_free_rate);

    Ok(BacktestResult {
        results,
        ledger,
        metrics,
    })
}
