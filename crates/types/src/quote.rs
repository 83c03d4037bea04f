use crate::series::{Reusable, Series};

/// One OHLCV event.
///
/// `timestamp_ns` is the ordering key; a second quote with the same
/// timestamp is a revision of the first, not a new bar.
///
/// Equality is bitwise on every field, so a quote carrying NaN equals an
/// identical copy of itself and `0.0` differs from `-0.0`.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Quote {
    /// Unix epoch nanoseconds UTC (open time)
    pub timestamp_ns: i64,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume
    pub volume: f64,
}

impl Quote {
    /// Creates a quote from its components.
    #[must_use]
    pub fn new(timestamp_ns: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp_ns,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns a copy with a different close (high/low widened to contain it).
    #[must_use]
    pub fn with_close(mut self, close: f64) -> Self {
        self.close = close;
        self.high = self.high.max(close);
        self.low = self.low.min(close);
        self
    }
}

impl PartialEq for Quote {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp_ns == other.timestamp_ns
            && self.open.to_bits() == other.open.to_bits()
            && self.high.to_bits() == other.high.to_bits()
            && self.low.to_bits() == other.low.to_bits()
            && self.close.to_bits() == other.close.to_bits()
            && self.volume.to_bits() == other.volume.to_bits()
    }
}

impl Eq for Quote {}

impl Series for Quote {
    fn timestamp_ns(&self) -> i64 {
        self.timestamp_ns
    }
}

impl Reusable for Quote {
    fn value(&self) -> Option<f64> {
        Some(self.close)
    }
}

/// A bare timestamped value, for streams that are not OHLCV.
///
/// Compared bitwise, like [`Quote`].
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct TimeValue {
    /// Unix epoch nanoseconds UTC
    pub timestamp_ns: i64,
    /// Observed value
    pub value: f64,
}

impl TimeValue {
    /// Creates a new point.
    #[must_use]
    pub fn new(timestamp_ns: i64, value: f64) -> Self {
        Self {
            timestamp_ns,
            value,
        }
    }
}

impl PartialEq for TimeValue {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp_ns == other.timestamp_ns && self.value.to_bits() == other.value.to_bits()
    }
}

impl Eq for TimeValue {}

impl Series for TimeValue {
    fn timestamp_ns(&self) -> i64 {
        self.timestamp_ns
    }
}

impl Reusable for TimeValue {
    fn value(&self) -> Option<f64> {
        Some(self.value)
    }
}
