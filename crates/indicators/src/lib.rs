//! Strata Indicators
//!
//! Pluggable algorithms for the Strata streaming engine.
//!
//! # Features
//! - Batch computation over complete series via [`Indicator`]
//! - Streaming hubs via [`strata_stream::Algorithm`], chainable where the
//!   result carries a single value
//! - Bounded lists via [`Buffered`] and [`strata_stream::BufferList`]
//! - Parameter validation at construction
//!
//! # Available Indicators
//! - SMA: Simple Moving Average
//! - EMA: Exponential Moving Average
//! - RSI: Relative Strength Index (Wilder smoothing)
//! - ATR: Average True Range (Wilder smoothing)
//! - Bollinger Bands: SMA, bands, %B, z-score and width
//! - ZigZag: swing points and retrace lines (repaints)
//! - Fractal: Williams fractals (repaints)

#![deny(clippy::all)]

pub mod error;
pub mod impl_;
mod math;
pub mod traits;

// Re-export main types
pub use error::IndicatorError;
pub use traits::{Buffered, EndType, Indicator};

// Re-export indicator implementations
pub use impl_::{
    atr::{ATR, AtrBuffer, AtrResult},
    bollinger::{BollingerBands, BollingerBuffer, BollingerResult},
    ema::{EMA, EmaBuffer, EmaResult},
    fractal::{Fractal, FractalBuffer, FractalResult},
    rsi::{RSI, RsiBuffer, RsiResult, RsiState},
    sma::{SMA, SmaBuffer, SmaResult},
    zig_zag::{PointType, ZigZag, ZigZagResult},
};
