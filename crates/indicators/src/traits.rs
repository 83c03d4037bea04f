//! Indicator traits and shared parameter types.
//!
//! Every indicator exposes the same computation three ways: a batch
//! [`Indicator`], a streaming [`strata_stream::Algorithm`] for hubs, and a
//! [`strata_stream::BufferAlgorithm`] companion for bounded lists. All three
//! share their per-position arithmetic, so their outputs are identical.

use strata_stream::{BufferAlgorithm, BufferList};
use strata_types::Quote;

use crate::error::IndicatorError;

/// Which prices a swing detector evaluates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndType {
    /// Close only.
    Close,
    /// High for peaks, low for troughs.
    #[default]
    HighLow,
}

impl EndType {
    /// Price compared when looking for a peak.
    #[must_use]
    pub fn high(self, quote: &Quote) -> f64 {
        match self {
            EndType::Close => quote.close,
            EndType::HighLow => quote.high,
        }
    }

    /// Price compared when looking for a trough.
    #[must_use]
    pub fn low(self, quote: &Quote) -> f64 {
        match self {
            EndType::Close => quote.close,
            EndType::HighLow => quote.low,
        }
    }

    fn label(self) -> &'static str {
        match self {
            EndType::Close => "CLOSE",
            EndType::HighLow => "HIGHLOW",
        }
    }
}

impl std::fmt::Display for EndType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Batch computation over a complete series.
///
/// The output is aligned 1:1 with the input; warmup positions hold `None`
/// fields rather than being omitted.
pub trait Indicator<I>: Send + Sync {
    /// One result per input item.
    type Output;

    /// Computes the indicator for all items.
    fn compute(&self, items: &[I]) -> Vec<Self::Output>;

    /// Name of the indicator (e.g., "EMA", "ATR").
    fn name(&self) -> &str;

    /// Number of leading results that never hold a value.
    fn warmup_periods(&self) -> usize;

    /// Minimum input length accepted by [`Indicator::try_compute`].
    fn required_history(&self) -> usize {
        self.warmup_periods() + 1
    }

    /// Like [`Indicator::compute`] but rejects input shorter than
    /// [`Indicator::required_history`].
    ///
    /// # Errors
    /// Returns [`IndicatorError::InsufficientData`] on short input.
    fn try_compute(&self, items: &[I]) -> Result<Vec<Self::Output>, IndicatorError> {
        let required = self.required_history();
        if items.len() < required {
            return Err(IndicatorError::InsufficientData {
                required,
                actual: items.len(),
            });
        }
        Ok(self.compute(items))
    }
}

/// Indicators with a bounded-list companion.
pub trait Buffered<I> {
    /// Incremental state machine fed one item at a time.
    type Buffer: BufferAlgorithm<I>;

    /// Creates a fresh buffer algorithm with the same parameters.
    fn buffer(&self) -> Self::Buffer;

    /// Creates a list keeping at most `max_list_size` results.
    ///
    /// # Errors
    /// Returns [`IndicatorError::Stream`] if `max_list_size` is 0.
    fn buffer_list(&self, max_list_size: usize) -> Result<BufferList<I, Self::Buffer>, IndicatorError> {
        Ok(BufferList::with_max_list_size(self.buffer(), max_list_size)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_type_prices() {
        let quote = Quote::new(0, 10.0, 12.0, 9.0, 11.0, 100.0);

        assert_eq!(EndType::Close.high(&quote), 11.0);
        assert_eq!(EndType::Close.low(&quote), 11.0);
        assert_eq!(EndType::HighLow.high(&quote), 12.0);
        assert_eq!(EndType::HighLow.low(&quote), 9.0);
    }

    #[test]
    fn test_end_type_serde() {
        let parsed: EndType = serde_json::from_str("\"high_low\"").unwrap();
        assert_eq!(parsed, EndType::HighLow);
        assert_eq!(EndType::Close.to_string(), "CLOSE");
    }
}
