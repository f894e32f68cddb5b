//! Error types.
//!
//! The statistical core fails only on conditions it cannot compute around:
//! too few observations for control limits, non-finite or negative input,
//! or an invalid tuning parameter. Empty inputs to the classifier, pattern
//! detector, trend analyzer and recommendation engine are not errors; those
//! produce empty or neutral results.

use thiserror::Error;

/// Failure of a statistical computation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpcError {
    /// Fewer observations than control-limit estimation requires.
    #[error("insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Minimum sample size.
        required: usize,
        /// Sample size supplied.
        actual: usize,
    },

    /// An observation is NaN or infinite.
    #[error("non-finite value at index {index}")]
    NonFiniteValue {
        /// Position of the offending observation.
        index: usize,
    },

    /// An observation is negative; flow rates are non-negative quantities.
    #[error("negative value {value} at index {index}")]
    NegativeValue {
        /// Position of the offending observation.
        index: usize,
        /// The rejected observation.
        value: f64,
    },

    /// A tuning parameter is out of its admissible range.
    #[error("invalid parameter `{name}`: {value}")]
    InvalidParameter {
        /// Parameter name as it appears in configuration.
        name: &'static str,
        /// Rejected value, rendered for display.
        value: String,
    },

    /// Configuration text could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SpcError {
    pub(crate) fn invalid(name: &'static str, value: impl ToString) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
        }
    }
}

/// Failure reported by a measurement store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The monitoring point is unknown to the store.
    #[error("monitoring point not found: {0}")]
    PointNotFound(String),

    /// Any other storage-side failure.
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Failure of one monitoring-point evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MonitorError {
    /// A statistical computation failed.
    #[error(transparent)]
    Spc(#[from] SpcError),

    /// Reading or writing the store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_message() {
        let err = SpcError::InsufficientData {
            required: 10,
            actual: 5,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 10 observations, got 5"
        );
    }

    #[test]
    fn test_monitor_error_wraps_transparently() {
        let err: MonitorError = StoreError::PointNotFound("ctp-7".into()).into();
        assert_eq!(err.to_string(), "monitoring point not found: ctp-7");

        let err: MonitorError = SpcError::NonFiniteValue { index: 3 }.into();
        assert!(matches!(err, MonitorError::Spc(SpcError::NonFiniteValue { index: 3 })));
    }

    #[test]
    fn test_invalid_parameter_renders_value() {
        let err = SpcError::invalid("trend.window", 0);
        assert_eq!(err.to_string(), "invalid parameter `trend.window`: 0");
    }
}
