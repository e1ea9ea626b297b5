//! Error types for the A-share rules engine
//!
//! Only caller bugs and infrastructure failures are errors. Expected
//! trading-rule rejections are reported through
//! [`RuleViolation`](crate::finance::admission::RuleViolation) instead.

use thiserror::Error;

/// Main error type for the rules engine
#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cash sink unavailable: {0}")]
    CashSinkUnavailable(String),

    #[error("Calendar error: {0}")]
    CalendarError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl RulesError {
    /// Shorthand for [`RulesError::InvalidInput`]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Result type alias for rules engine operations
pub type Result<T> = std::result::Result<T, RulesError>;
