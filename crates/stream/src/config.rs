//! Provider and hub configuration.

use crate::error::StreamError;

/// Upper bound for `max_cache_size` (and its default).
pub const DEFAULT_MAX_CACHE_SIZE: usize = 1_932_735_282;

/// When a repaint-policy hub rebuilds its cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepaintMode {
    /// Rebuild on every upstream mutation.
    #[default]
    Eager,
    /// Mark stale and rebuild on the next read.
    ///
    /// A hub with subscribers always rebuilds eagerly.
    OnRead,
}

/// Settings shared by a provider and every hub chained to it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StreamConfig {
    /// Eviction threshold for the provider cache.
    ///
    /// The cache never shrinks below the aggregate `min_cache_size` of its
    /// subscribers, whichever is larger wins.
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,
    /// Rebuild timing for repaint-policy hubs.
    #[serde(default)]
    pub repaint: RepaintMode,
}

fn default_max_cache_size() -> usize {
    DEFAULT_MAX_CACHE_SIZE
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            repaint: RepaintMode::default(),
        }
    }
}

impl StreamConfig {
    /// Creates a validated configuration with the given eviction threshold.
    ///
    /// # Errors
    /// Returns [`StreamError::InvalidConfig`] if `max_cache_size` is out of range.
    pub fn with_max_cache_size(max_cache_size: usize) -> Result<Self, StreamError> {
        let config = Self {
            max_cache_size,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the repaint mode.
    #[must_use]
    pub fn repaint(mut self, mode: RepaintMode) -> Self {
        self.repaint = mode;
        self
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    /// Returns [`StreamError::Config`] on malformed JSON and
    /// [`StreamError::InvalidConfig`] on out-of-range values.
    pub fn from_json(json: &str) -> Result<Self, StreamError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates value ranges.
    ///
    /// # Errors
    /// Returns [`StreamError::InvalidConfig`] if `max_cache_size` is zero or
    /// above [`DEFAULT_MAX_CACHE_SIZE`].
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.max_cache_size == 0 || self.max_cache_size > DEFAULT_MAX_CACHE_SIZE {
            return Err(StreamError::invalid_config(format!(
                "max_cache_size must be in 1..={DEFAULT_MAX_CACHE_SIZE}, got {}",
                self.max_cache_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = StreamConfig::from_json("{}").unwrap();
        assert_eq!(config, StreamConfig::default());
        assert_eq!(config.repaint, RepaintMode::Eager);
    }

    #[test]
    fn test_from_json_overrides() {
        let config =
            StreamConfig::from_json(r#"{"max_cache_size": 250, "repaint": "on_read"}"#).unwrap();
        assert_eq!(config.max_cache_size, 250);
        assert_eq!(config.repaint, RepaintMode::OnRead);
    }

    #[test]
    fn test_rejects_zero_cache() {
        let err = StreamConfig::with_max_cache_size(0).unwrap_err();
        assert!(matches!(err, StreamError::InvalidConfig(_)));

        let err = StreamConfig::from_json(r#"{"max_cache_size": 0}"#).unwrap_err();
        assert!(matches!(err, StreamError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_oversized_cache() {
        assert!(StreamConfig::with_max_cache_size(DEFAULT_MAX_CACHE_SIZE).is_ok());
        assert!(StreamConfig::with_max_cache_size(DEFAULT_MAX_CACHE_SIZE + 1).is_err());
    }

    #[test]
    fn test_malformed_json() {
        let err = StreamConfig::from_json("{max_cache_size").unwrap_err();
        assert!(matches!(err, StreamError::Config(_)));
    }
}
