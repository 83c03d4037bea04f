//! Stream engine error types.

use thiserror::Error;

/// Errors raised by the streaming engine.
///
/// Mutations never fail: rejected inserts and removals are reported through
/// [`crate::Mutation`] instead.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be parsed.
    #[error("configuration parse error: {0}")]
    Config(#[from] serde_json::Error),

    /// A hub's provider no longer exists.
    #[error("upstream of {0} has been dropped")]
    UpstreamDropped(String),

    /// The operation needs a subscribed hub.
    #[error("{0} is not subscribed")]
    Detached(String),
}

impl StreamError {
    /// Creates an `InvalidConfig` error with a message.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        StreamError::InvalidConfig(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StreamError::invalid_config("max_cache_size must be > 0");
        assert_eq!(
            err.to_string(),
            "invalid configuration: max_cache_size must be > 0"
        );
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StreamError = json_err.into();
        assert!(matches!(err, StreamError::Config(_)));
    }
}
