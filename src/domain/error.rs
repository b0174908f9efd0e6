//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for ledgersim.
#[derive(Debug, thiserror::Error)]
pub enum LedgersimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Universe(#[from] super::universe::UniverseError),

    #[error("price data error: {reason}")]
    DataSource { reason: String },

    #[error("no price data between {start} and {end}")]
    NoData { start: NaiveDate, end: NaiveDate },

    /// A held instrument has no price on a simulated date.
    #[error("missing price for held instrument {instrument} on {date}")]
    DataGap { date: NaiveDate, instrument: String },

    #[error("engine misuse: {reason}")]
    ConfigurationMisuse { reason: String },

    #[error("run cancelled after {completed} of {total} periods")]
    Cancelled { completed: usize, total: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&LedgersimError> for std::process::ExitCode {
    fn from(err: &LedgersimError) -> Self {
        let code: u8 = match err {
            LedgersimError::Io(_) => 1,
            LedgersimError::ConfigParse { .. }
            | LedgersimError::ConfigMissing { .. }
            | LedgersimError::ConfigInvalid { .. }
            | LedgersimError::Universe(_) => 2,
            LedgersimError::DataSource { .. } => 3,
            LedgersimError::NoData { .. } | LedgersimError::DataGap { .. } => 5,
            LedgersimError::ConfigurationMisuse { .. } | LedgersimError::Cancelled { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
