//! Indicator implementations
//!
//! Each module provides the batch indicator, its streaming algorithm and,
//! where it makes sense, a bounded-buffer companion.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod fractal;
pub mod rsi;
pub mod sma;
pub mod zig_zag;
