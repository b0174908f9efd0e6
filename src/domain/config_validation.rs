//! Configuration validation.
//!
//! Validates every `[backtest]` and `[data]` field before an engine is built.

use crate::domain::cost_model::FinancingBasis;
use crate::domain::error::LedgersimError;
use crate::domain::universe::parse_universe;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), LedgersimError> {
    validate_initial_cash(config)?;
    validate_execution_cost(config)?;
    validate_financing(config)?;
    validate_risk_free_rate(config)?;
    validate_dates(config)?;
    validate_universe(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), LedgersimError> {
    match config.get_string("data", "prices_path") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(LedgersimError::ConfigMissing {
            section: "data".to_string(),
            key: "prices_path".to_string(),
        }),
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> LedgersimError {
    LedgersimError::ConfigInvalid {
        section: "backtest".to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Present values must parse; absent values fall back to `default`.
fn parse_double(config: &dyn ConfigPort, key: &str, default: f64) -> Result<f64, LedgersimError> {
    match config.get_string("backtest", key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(key, format!("{key} must be a number, got '{raw}'"))),
    }
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), LedgersimError> {
    let value = parse_double(config, "initial_cash", 0.0)?;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid("initial_cash", "initial_cash must be positive"));
    }
    Ok(())
}

fn validate_execution_cost(config: &dyn ConfigPort) -> Result<(), LedgersimError> {
    let value = parse_double(config, "execution_cost_bps", 0.0)?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(
            "execution_cost_bps",
            "execution_cost_bps must be non-negative",
        ));
    }
    Ok(())
}

fn validate_financing(config: &dyn ConfigPort) -> Result<(), LedgersimError> {
    let value = parse_double(config, "financing_cost", 0.0)?;
    if !value.is_finite() {
        return Err(invalid("financing_cost", "financing_cost must be finite"));
    }
    if let Some(basis) = config.get_string("backtest", "financing_basis") {
        basis
            .parse::<FinancingBasis>()
            .map_err(|reason| invalid("financing_basis", reason))?;
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), LedgersimError> {
    let value = parse_double(config, "risk_free_rate", 0.0)?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), LedgersimError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(invalid("start_date", "start_date must be before end_date"));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, LedgersimError> {
    match value {
        None => Err(LedgersimError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                field,
                format!("invalid {field} format, expected YYYY-MM-DD"),
            )
        }),
    }
}

fn validate_universe(config: &dyn ConfigPort) -> Result<(), LedgersimError> {
    match config.get_string("backtest", "universe") {
        Some(s) => {
            parse_universe(&s)?;
            Ok(())
        }
        None => Err(LedgersimError::ConfigMissing {
            section: "backtest".to_string(),
            key: "universe".to_string(),
        }),
    }
}
