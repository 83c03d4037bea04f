//! Time-series item traits.

/// An item positioned on a timeline.
///
/// Every cache in the engine is ordered by `timestamp_ns` and holds at most
/// one item per timestamp.
pub trait Series {
    /// Unix epoch nanoseconds UTC; the ordering key.
    fn timestamp_ns(&self) -> i64;
}

/// A series item that can feed a chained hub.
///
/// `None` marks a warmup or otherwise incalculable position upstream.
/// `Some(NaN)` is a computed value contaminated by bad input and is passed
/// through as-is.
pub trait Reusable: Series {
    /// The single value a downstream algorithm consumes.
    fn value(&self) -> Option<f64>;
}
