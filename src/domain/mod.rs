//! Core domain types and logic.

pub mod price_series;
pub mod cost_model;
pub mod ledger;
pub mod policy;
pub mod result;
pub mod engine;
pub mod backtest;
pub mod metrics;
pub mod universe;
pub mod config_validation;
pub mod error;
