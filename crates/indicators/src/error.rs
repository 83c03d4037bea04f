//! Indicator error types.

use strata_stream::StreamError;
use thiserror::Error;

/// Errors raised while constructing or batch-computing an indicator.
///
/// Streaming and buffered paths never fail on short input; they emit `None`
/// until enough history has accumulated.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// Invalid parameters for the indicator
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Insufficient data for batch computation
    #[error("insufficient data: need {required} items, got {actual}")]
    InsufficientData {
        /// Required number of items.
        required: usize,
        /// Actual number of items provided.
        actual: usize,
    },

    /// Parameter out of valid range
    #[error("parameter out of range: {param} = {value} (valid: {min}..{max})")]
    ParamOutOfRange {
        /// Parameter name.
        param: String,
        /// Parameter value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Streaming engine rejected a configuration
    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl IndicatorError {
    /// Creates an `InvalidParams` error with a message.
    #[must_use]
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        IndicatorError::InvalidParams(msg.into())
    }

    /// Creates a `ParamOutOfRange` error.
    #[must_use]
    pub fn param_out_of_range(param: impl Into<String>, value: f64, min: f64, max: f64) -> Self {
        IndicatorError::ParamOutOfRange {
            param: param.into(),
            value,
            min,
            max,
        }
    }

    /// Checks an integer parameter against an inclusive lower bound.
    ///
    /// # Errors
    /// Returns `ParamOutOfRange` when `value < min`.
    pub fn require_at_least(param: &str, value: usize, min: usize) -> Result<usize, Self> {
        if value < min {
            return Err(Self::param_out_of_range(
                param,
                value as f64,
                min as f64,
                f64::INFINITY,
            ));
        }
        Ok(value)
    }
}
