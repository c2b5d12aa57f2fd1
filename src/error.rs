//! Crate error type.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while loading scenarios, exporting telemetry or
/// setting up logging. The twin and agent core never fail.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// One or more validation failures, already formatted.
    #[error("invalid scenario:\n{0}")]
    Invalid(String),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl Error {
    /// Collapses a list of validation errors into one [`Error::Invalid`].
    pub fn invalid(errors: &[ConfigError]) -> Self {
        let lines: Vec<String> = errors.iter().map(|e| format!("  {e}")).collect();
        Self::Invalid(lines.join("\n"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
