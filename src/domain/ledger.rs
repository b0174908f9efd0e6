//! Cash and signed positions, mutated only through buy/sell/liquidate and the
//! end-of-period financing step.
//!
//! A position that reaches exactly zero is removed from the map; callers never see
//! a zero entry.

use std::collections::BTreeMap;

use super::cost_model::CostModel;
use super::error::LedgersimError;
use super::price_series::PriceSlice;

/// Quantity argument for [`Ledger::sell`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SellQuantity {
    /// Close the whole holding.
    All,
    Units(f64),
}

/// Why an order was dropped. Never fatal to a run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderRejected {
    #[error("invalid quantity {quantity} for {instrument}")]
    InvalidQuantity { instrument: String, quantity: f64 },

    #[error("no price for {instrument} on the current date")]
    NoPrice { instrument: String },

    #[error("insufficient cash for {instrument}: need {required:.2}, have {available:.2}")]
    InsufficientCash {
        instrument: String,
        required: f64,
        available: f64,
    },

    #[error("no position in {instrument} to sell")]
    NoPosition { instrument: String },

    #[error("nothing to liquidate in {instrument}")]
    NothingToLiquidate { instrument: String },
}

/// Outcome of an accepted order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub instrument: String,
    /// Signed change in the position: positive when bought, negative when sold.
    pub quantity: f64,
    pub price: f64,
    pub notional: f64,
    pub fee: f64,
    pub cash_delta: f64,
    /// Position after the fill, zero when the entry was removed.
    pub position_after: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    cash: f64,
    positions: BTreeMap<String, f64>,
    fees_paid: f64,
    financing_paid: f64,
}

impl Ledger {
    pub fn new(initial_cash: f64) -> Self {
        Ledger {
            cash: initial_cash,
            positions: BTreeMap::new(),
            fees_paid: 0.0,
            financing_paid: 0.0,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Held quantity; zero when flat.
    pub fn position(&self, instrument: &str) -> f64 {
        self.positions.get(instrument).copied().unwrap_or(0.0)
    }

    pub fn holds(&self, instrument: &str) -> bool {
        self.positions.contains_key(instrument)
    }

    pub fn positions(&self) -> &BTreeMap<String, f64> {
        &self.positions
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Total execution fees charged so far.
    pub fn fees_paid(&self) -> f64 {
        self.fees_paid
    }

    /// Net financing paid so far; negative when rebates exceeded charges.
    pub fn financing_paid(&self) -> f64 {
        self.financing_paid
    }

    /// Buy `quantity` at `price`. Rejected without side effects when the notional
    /// plus fee exceeds cash.
    pub fn buy(
        &mut self,
        instrument: &str,
        quantity: f64,
        price: f64,
        costs: &CostModel,
    ) -> Result<Fill, OrderRejected> {
        check_quantity(instrument, quantity)?;

        let notional = price * quantity;
        let fee = costs.execution_fee(notional);
        let required = notional + fee;
        if required > self.cash {
            return Err(OrderRejected::InsufficientCash {
                instrument: instrument.to_string(),
                required,
                available: self.cash,
            });
        }

        self.cash -= required;
        self.fees_paid += fee;
        let position_after = self.adjust(instrument, quantity);

        Ok(Fill {
            instrument: instrument.to_string(),
            quantity,
            price,
            notional,
            fee,
            cash_delta: -required,
            position_after,
        })
    }

    /// Sell from an existing holding. A numeric quantity larger than the holding
    /// leaves a short of `held - quantity`; an instrument never held is rejected.
    pub fn sell(
        &mut self,
        instrument: &str,
        quantity: SellQuantity,
        price: f64,
        costs: &CostModel,
    ) -> Result<Fill, OrderRejected> {
        let held = match self.positions.get(instrument) {
            Some(&held) => held,
            None => {
                return Err(OrderRejected::NoPosition {
                    instrument: instrument.to_string(),
                });
            }
        };

        match quantity {
            SellQuantity::All => Ok(self.close(instrument, held, price, costs)),
            SellQuantity::Units(units) => {
                check_quantity(instrument, units)?;

                let notional = price * units;
                let fee = costs.execution_fee(notional);
                let cash_delta = notional - fee;

                self.cash += cash_delta;
                self.fees_paid += fee;
                let position_after = self.adjust(instrument, -units);

                Ok(Fill {
                    instrument: instrument.to_string(),
                    quantity: -units,
                    price,
                    notional,
                    fee,
                    cash_delta,
                    position_after,
                })
            }
        }
    }

    /// Close a long or short holding in full.
    pub fn liquidate(
        &mut self,
        instrument: &str,
        price: f64,
        costs: &CostModel,
    ) -> Result<Fill, OrderRejected> {
        match self.positions.get(instrument) {
            Some(&held) if held != 0.0 => Ok(self.close(instrument, held, price, costs)),
            _ => Err(OrderRejected::NothingToLiquidate {
                instrument: instrument.to_string(),
            }),
        }
    }

    /// Charge one period of financing on every short position. Returns the net cash
    /// adjustment.
    pub fn apply_financing_fee(
        &mut self,
        prices: &PriceSlice<'_>,
        costs: &CostModel,
    ) -> Result<f64, LedgersimError> {
        let mut total = 0.0;
        for (instrument, &quantity) in self.positions.iter().filter(|(_, q)| **q < 0.0) {
            let price = prices.get(instrument).ok_or_else(|| LedgersimError::DataGap {
                date: prices.date(),
                instrument: instrument.clone(),
            })?;
            total += costs.financing_charge(quantity, price);
        }
        self.cash += total;
        self.financing_paid -= total;
        Ok(total)
    }

    /// Mark-to-market value of all positions. Fails on the first held instrument
    /// without a price.
    pub fn market_value(&self, prices: &PriceSlice<'_>) -> Result<f64, LedgersimError> {
        self.positions
            .iter()
            .map(|(instrument, &quantity)| {
                prices
                    .get(instrument)
                    .map(|price| quantity * price)
                    .ok_or_else(|| LedgersimError::DataGap {
                        date: prices.date(),
                        instrument: instrument.clone(),
                    })
            })
            .sum()
    }

    fn close(&mut self, instrument: &str, held: f64, price: f64, costs: &CostModel) -> Fill {
        let notional = held * price;
        let fee = costs.execution_fee(notional.abs());
        let cash_delta = notional - fee;

        self.cash += cash_delta;
        self.fees_paid += fee;
        self.positions.remove(instrument);

        Fill {
            instrument: instrument.to_string(),
            quantity: -held,
            price,
            notional,
            fee,
            cash_delta,
            position_after: 0.0,
        }
    }

    fn adjust(&mut self, instrument: &str, delta: f64) -> f64 {
        let entry = self.positions.entry(instrument.to_string()).or_insert(0.0);
        *entry += delta;
        let after = *entry;
        if after == 0.0 {
            self.positions.remove(instrument);
        }
        after
    }
}

fn check_quantity(instrument: &str, quantity: f64) -> Result<(), OrderRejected> {
    if quantity.is_finite() && quantity > 0.0 {
        Ok(())
    } else {
        Err(OrderRejected::InvalidQuantity {
            instrument: instrument.to_string(),
            quantity,
        })
    }
}
