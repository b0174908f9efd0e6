//! The fixed set of instruments eligible for trading in a run.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    instruments: Vec<String>,
}

impl Universe {
    pub fn new(instruments: Vec<String>) -> Result<Self, UniverseError> {
        if instruments.is_empty() {
            return Err(UniverseError::Empty);
        }
        let mut seen = std::collections::HashSet::new();
        for instrument in &instruments {
            if instrument.trim().is_empty() {
                return Err(UniverseError::EmptyToken);
            }
            if !seen.insert(instrument.as_str()) {
                return Err(UniverseError::DuplicateInstrument(instrument.clone()));
            }
        }
        Ok(Self { instruments })
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn contains(&self, instrument: &str) -> bool {
        self.instruments.iter().any(|i| i == instrument)
    }

    pub fn count(&self) -> usize {
        self.instruments.len()
    }

    pub fn into_instruments(self) -> Vec<String> {
        self.instruments
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("universe is empty")]
    Empty,

    #[error("empty token in instrument list")]
    EmptyToken,

    #[error("duplicate instrument: {0}")]
    DuplicateInstrument(String),
}

/// Parse a comma-separated instrument list. Tickers are trimmed and upper-cased.
pub fn parse_universe(input: &str) -> Result<Universe, UniverseError> {
    if input.trim().is_empty() {
        return Err(UniverseError::Empty);
    }
    let instruments = input
        .split(',')
        .map(|token| {
            let trimmed = token.trim();
            if trimmed.is_empty() {
                Err(UniverseError::EmptyToken)
            } else {
                Ok(trimmed.to_uppercase())
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Universe::new(instruments)
}
