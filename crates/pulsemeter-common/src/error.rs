//! Error types for the pulsemeter engine
//!
//! Provides a unified error type and domain-specific error variants.
//! None of these are fatal to the registry: a failing meter is disabled,
//! a failing query answers absent.

use thiserror::Error;

/// Result type alias using MeterError
pub type Result<T> = std::result::Result<T, MeterError>;

/// Unified error type for metering operations
#[derive(Debug, Error)]
pub enum MeterError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // Lookup errors
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    // Interval errors
    #[error("Interval error: {0}")]
    Interval(#[from] IntervalError),
}

/// Meter configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Counter cell has no usable id")]
    EmptyCounterId,

    #[error("Meter '{0}' declares no tick source")]
    MissingTickConf(String),

    #[error("Item '{tick}' given as tick source for meter '{meter}' not found")]
    TickSourceNotFound { meter: String, tick: String },

    #[error("Invalid increment '{value}' configured for meter '{meter}'")]
    InvalidIncrement { meter: String, value: String },
}

/// Meter and host item lookup errors
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Meter '{0}' not found")]
    MeterNotFound(String),

    #[error("Item '{0}' not found")]
    ItemNotFound(String),
}

/// Day-span parsing and interval arithmetic errors
#[derive(Debug, Error)]
pub enum IntervalError {
    #[error("Invalid interval '{0}'. Allowed is '#[d|w|m|y]'")]
    InvalidSpan(String),

    #[error("Interval of {days} days is out of range")]
    OutOfRange { days: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MeterError::Lookup(LookupError::MeterNotFound("kitchen.meter".to_string()));
        assert!(err.to_string().contains("kitchen.meter"));
    }

    #[test]
    fn test_config_error_names_offender() {
        let err = ConfigError::InvalidIncrement {
            meter: "kitchen.meter".to_string(),
            value: "two".to_string(),
        };
        assert!(err.to_string().contains("'two'"));
        assert!(err.to_string().contains("kitchen.meter"));
    }

    #[test]
    fn test_interval_error_names_offending_value() {
        let err = IntervalError::InvalidSpan("3x".to_string());
        assert!(err.to_string().contains("3x"));
        assert!(err.to_string().contains("[d|w|m|y]"));
    }
}
