//! Strata Types
//!
//! Core data structures shared by the Strata streaming engine and its
//! indicator algorithms: timestamped OHLCV quotes, raw time/value points,
//! and the `Series` / `Reusable` traits every cached item implements.

#![deny(clippy::all)]

pub mod quote;
pub mod series;

// Re-export main types for convenience
pub use quote::{Quote, TimeValue};
pub use series::{Reusable, Series};
