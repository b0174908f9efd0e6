//! Execution and financing cost computation.

use crate::domain::error::LedgersimError;
use std::fmt;
use std::str::FromStr;

pub const BPS_PER_UNIT: f64 = 10_000.0;

/// What the per-period financing rate is multiplied by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinancingBasis {
    /// Signed short quantity times rate, independent of price.
    #[default]
    Quantity,
    /// Signed short quantity times price times rate.
    Notional,
}

impl FromStr for FinancingBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quantity" => Ok(FinancingBasis::Quantity),
            "notional" => Ok(FinancingBasis::Notional),
            other => Err(format!("unknown financing basis '{other}'")),
        }
    }
}

impl fmt::Display for FinancingBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinancingBasis::Quantity => write!(f, "quantity"),
            FinancingBasis::Notional => write!(f, "notional"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CostModel {
    execution_rate: f64,
    financing_rate: f64,
    financing_basis: FinancingBasis,
}

impl CostModel {
    /// Build a cost model from an execution cost in basis points and a per-period
    /// financing rate.
    pub fn new(execution_cost_bps: f64, financing_rate: f64) -> Result<Self, LedgersimError> {
        let mut model = CostModel::default();
        model.set_execution_cost_bps(execution_cost_bps)?;
        model.set_financing_rate(financing_rate)?;
        Ok(model)
    }

    pub fn with_financing_basis(mut self, basis: FinancingBasis) -> Self {
        self.financing_basis = basis;
        self
    }

    pub fn set_execution_cost_bps(&mut self, bps: f64) -> Result<(), LedgersimError> {
        if !bps.is_finite() || bps < 0.0 {
            return Err(LedgersimError::ConfigInvalid {
                section: "backtest".into(),
                key: "execution_cost_bps".into(),
                reason: format!("execution cost must be a non-negative number, got {bps}"),
            });
        }
        self.execution_rate = bps / BPS_PER_UNIT;
        Ok(())
    }

    /// Negative rates are rebates.
    pub fn set_financing_rate(&mut self, rate: f64) -> Result<(), LedgersimError> {
        if !rate.is_finite() {
            return Err(LedgersimError::ConfigInvalid {
                section: "backtest".into(),
                key: "financing_cost".into(),
                reason: format!("financing cost must be finite, got {rate}"),
            });
        }
        self.financing_rate = rate;
        Ok(())
    }

    pub fn execution_rate(&self) -> f64 {
        self.execution_rate
    }

    pub fn financing_rate(&self) -> f64 {
        self.financing_rate
    }

    pub fn financing_basis(&self) -> FinancingBasis {
        self.financing_basis
    }

    /// notional * execution_rate
    pub fn execution_fee(&self, notional: f64) -> f64 {
        notional * self.execution_rate
    }

    /// Signed cash adjustment for holding `short_quantity` for one period. Negative
    /// when a short costs money.
    pub fn financing_charge(&self, short_quantity: f64, price: f64) -> f64 {
        match self.financing_basis {
            FinancingBasis::Quantity => short_quantity * self.financing_rate,
            FinancingBasis::Notional => short_quantity * price * self.financing_rate,
        }
    }
}
