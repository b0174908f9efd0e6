//! Day-by-day simulation loop.
//!
//! Each period: advance the clock, lend the policy an order handle over the
//! ledger, charge financing on shorts, mark positions to market and append one
//! [`PeriodRecord`]. Periods are processed strictly in date order and never
//! overlap.

use chrono::NaiveDate;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, trace};

use super::cost_model::CostModel;
use super::error::LedgersimError;
use super::ledger::Ledger;
use super::policy::{Orders, Policy};
use super::price_series::PriceSeries;
use super::result::{PeriodRecord, ResultSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Configured, not yet run. Cost rates may still change.
    Ready,
    /// Inside `run`.
    Running,
    /// Run completed or aborted; call `reset` before running again.
    Finished,
}

#[derive(Debug)]
pub struct SimulationEngine {
    prices: PriceSeries,
    costs: CostModel,
    initial_cash: f64,
    ledger: Ledger,
    current_date: Option<NaiveDate>,
    results: ResultSeries,
    state: RunState,
    cancel: Option<Arc<AtomicBool>>,
}

impl SimulationEngine {
    pub fn new(prices: PriceSeries, initial_cash: f64, costs: CostModel) -> Self {
        let current_date = prices.first_date();
        SimulationEngine {
            prices,
            costs,
            initial_cash,
            ledger: Ledger::new(initial_cash),
            current_date,
            results: ResultSeries::new(),
            state: RunState::Ready,
            cancel: None,
        }
    }

    /// Stop the run at the next period boundary once `flag` becomes true.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn set_execution_cost_bps(&mut self, bps: f64) -> Result<(), LedgersimError> {
        self.ensure_ready("execution cost")?;
        self.costs.set_execution_cost_bps(bps)
    }

    pub fn set_financing_cost(&mut self, rate: f64) -> Result<(), LedgersimError> {
        self.ensure_ready("financing cost")?;
        self.costs.set_financing_rate(rate)
    }

    /// Replay every date in the price series through `policy`.
    ///
    /// Order rejections are logged and do not stop the run. A held instrument
    /// without a price aborts with [`LedgersimError::DataGap`]; the records up to
    /// the previous period are kept.
    pub fn run<P: Policy + ?Sized>(
        &mut self,
        policy: &mut P,
    ) -> Result<&ResultSeries, LedgersimError> {
        if self.state != RunState::Ready {
            return Err(LedgersimError::ConfigurationMisuse {
                reason: "run() called on an engine that has already run; call reset() first"
                    .into(),
            });
        }

        info!(
            periods = self.prices.len(),
            instruments = self.prices.instruments().len(),
            initial_cash = self.initial_cash,
            execution_rate = self.costs.execution_rate(),
            financing_rate = self.costs.financing_rate(),
            "starting simulation"
        );

        self.state = RunState::Running;
        let outcome = self.run_periods(policy);
        self.state = RunState::Finished;
        outcome?;

        info!(
            periods = self.results.len(),
            rebalances = self.results.rebalance_count(),
            final_value = self.results.last().map(|r| r.total_value),
            fees_paid = self.ledger.fees_paid(),
            "simulation finished"
        );
        Ok(&self.results)
    }

    /// Restore the initial ledger and clock so the engine can run again.
    pub fn reset(&mut self) {
        self.ledger = Ledger::new(self.initial_cash);
        self.current_date = self.prices.first_date();
        self.results.clear();
        self.state = RunState::Ready;
    }

    fn run_periods<P: Policy + ?Sized>(&mut self, policy: &mut P) -> Result<(), LedgersimError> {
        let total = self.prices.len();

        for i in 0..total {
            if self
                .cancel
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
            {
                info!(completed = i, total, "simulation cancelled");
                return Err(LedgersimError::Cancelled {
                    completed: i,
                    total,
                });
            }

            let prices = self.prices.slice_at(i);
            let date = prices.date();
            self.current_date = Some(date);

            let mut orders = Orders::new(&mut self.ledger, &self.costs, prices);
            policy.on_period(date, &prices, &mut orders);
            let rebalanced = orders.rebalanced();

            let financing = self.ledger.apply_financing_fee(&prices, &self.costs)?;
            let portfolio_value = self.ledger.market_value(&prices)?;
            let total_value = portfolio_value + self.ledger.cash();

            trace!(%date, portfolio_value, total_value, financing, rebalanced, "period settled");

            self.results.push(PeriodRecord {
                date,
                total_value,
                portfolio_value,
                rebalanced,
            });
        }

        Ok(())
    }

    fn ensure_ready(&self, what: &str) -> Result<(), LedgersimError> {
        if self.state == RunState::Ready {
            Ok(())
        } else {
            Err(LedgersimError::ConfigurationMisuse {
                reason: format!("cannot change {what} after the run has started"),
            })
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn current_date(&self) -> Option<NaiveDate> {
        self.current_date
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn results(&self) -> &ResultSeries {
        &self.results
    }

    pub fn into_results(self) -> ResultSeries {
        self.results
    }

    pub fn prices(&self) -> &PriceSeries {
        &self.prices
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.costs
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }
}
