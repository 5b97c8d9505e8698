//! Common error types for services

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Service error types
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Market-data source failed or rejected the request
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Aggregation was handed an empty trade series
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// A display column could not be coerced to its target precision
    #[error("Numeric format error in column '{column}': {value}")]
    NumericFormat {
        /// Column being formatted
        column: &'static str,
        /// Offending value as text
        value: String,
    },

    /// Invalid request error
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// First interval is empty and no earlier trade exists to carry forward
    #[error("No trade precedes empty first interval at {0}")]
    MissingCarrySeed(DateTime<Utc>),
}

impl ServiceError {
    /// Whether a caller may retry the same request later
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::DataUnavailable(_))
    }
}

/// Result alias used across the services
pub type ServiceResult<T> = Result<T, ServiceError>;
