//! The trading policy extension point and the order handle lent to it each period.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::cost_model::CostModel;
use super::ledger::{Fill, Ledger, OrderRejected, SellQuantity};
use super::price_series::PriceSlice;

/// A trading strategy driven one period at a time.
///
/// The engine calls `on_period` once per date, in order, after the clock has
/// advanced. Every ledger change goes through `orders`, which is only valid for the
/// duration of the call.
pub trait Policy {
    fn on_period(&mut self, date: NaiveDate, prices: &PriceSlice<'_>, orders: &mut Orders<'_>);
}

impl<P: Policy + ?Sized> Policy for &mut P {
    fn on_period(&mut self, date: NaiveDate, prices: &PriceSlice<'_>, orders: &mut Orders<'_>) {
        (**self).on_period(date, prices, orders)
    }
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn on_period(&mut self, date: NaiveDate, prices: &PriceSlice<'_>, orders: &mut Orders<'_>) {
        (**self).on_period(date, prices, orders)
    }
}

/// Mutation capability over the ledger for a single period. Orders fill at that
/// period's price for the instrument.
pub struct Orders<'a> {
    ledger: &'a mut Ledger,
    costs: &'a CostModel,
    prices: PriceSlice<'a>,
    rebalanced: bool,
    fills: usize,
    rejections: usize,
}

impl<'a> Orders<'a> {
    pub fn new(ledger: &'a mut Ledger, costs: &'a CostModel, prices: PriceSlice<'a>) -> Self {
        Orders {
            ledger,
            costs,
            prices,
            rebalanced: false,
            fills: 0,
            rejections: 0,
        }
    }

    pub fn buy(&mut self, instrument: &str, quantity: f64) -> Result<Fill, OrderRejected> {
        let result = self
            .price(instrument)
            .and_then(|price| self.ledger.buy(instrument, quantity, price, self.costs));
        self.record("buy", result)
    }

    pub fn sell(
        &mut self,
        instrument: &str,
        quantity: SellQuantity,
    ) -> Result<Fill, OrderRejected> {
        let result = self
            .price(instrument)
            .and_then(|price| self.ledger.sell(instrument, quantity, price, self.costs));
        self.record("sell", result)
    }

    /// Shorthand for `sell(instrument, SellQuantity::All)`.
    pub fn sell_all(&mut self, instrument: &str) -> Result<Fill, OrderRejected> {
        self.sell(instrument, SellQuantity::All)
    }

    pub fn liquidate(&mut self, instrument: &str) -> Result<Fill, OrderRejected> {
        // Rejection takes precedence over a missing price so callers see the
        // "nothing to liquidate" reason for flat instruments.
        let result = if self.ledger.holds(instrument) {
            self.price(instrument)
                .and_then(|price| self.ledger.liquidate(instrument, price, self.costs))
        } else {
            Err(OrderRejected::NothingToLiquidate {
                instrument: instrument.to_string(),
            })
        };
        self.record("liquidate", result)
    }

    pub fn date(&self) -> NaiveDate {
        self.prices.date()
    }

    pub fn cash(&self) -> f64 {
        self.ledger.cash()
    }

    pub fn position(&self, instrument: &str) -> f64 {
        self.ledger.position(instrument)
    }

    pub fn positions(&self) -> &BTreeMap<String, f64> {
        self.ledger.positions()
    }

    pub fn costs(&self) -> &CostModel {
        self.costs
    }

    /// True once any order has been accepted this period.
    pub fn rebalanced(&self) -> bool {
        self.rebalanced
    }

    pub fn fill_count(&self) -> usize {
        self.fills
    }

    pub fn rejection_count(&self) -> usize {
        self.rejections
    }

    fn price(&self, instrument: &str) -> Result<f64, OrderRejected> {
        self.prices
            .get(instrument)
            .ok_or_else(|| OrderRejected::NoPrice {
                instrument: instrument.to_string(),
            })
    }

    fn record(
        &mut self,
        side: &str,
        result: Result<Fill, OrderRejected>,
    ) -> Result<Fill, OrderRejected> {
        match &result {
            Ok(fill) => {
                self.rebalanced = true;
                self.fills += 1;
                debug!(
                    date = %self.prices.date(),
                    side,
                    instrument = %fill.instrument,
                    quantity = fill.quantity,
                    price = fill.price,
                    fee = fill.fee,
                    "order filled"
                );
            }
            Err(reason) => {
                self.rejections += 1;
                warn!(date = %self.prices.date(), side, %reason, "order rejected");
            }
        }
        result
    }
}
