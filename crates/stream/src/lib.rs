//! Strata Stream
//!
//! Incremental computation engine for ordered time series.
//!
//! # Features
//! - Timestamp-ordered provider cache with append, ordered insert, revision
//!   and removal
//! - Hubs: one pluggable [`Algorithm`] each, with a result cache aligned 1:1
//!   to its upstream
//! - Synchronous depth-first propagation through chains of hubs
//! - Retention negotiation so eviction never drops history a subscriber
//!   still needs
//! - Full-rebuild policy for repainting algorithms
//! - [`BufferList`] for bounded single-stage use
//!
//! # Example
//! ```ignore
//! let quotes = QuoteHub::new();
//! let sma = quotes.subscribe(Sma::new(12)?);
//! let ema = sma.subscribe(Ema::new(20)?);
//! quotes.add(quote);
//! ```
//!
//! Everything is single-threaded: handles are `Rc`-based and every mutation
//! resolves the whole downstream graph before returning.

#![deny(clippy::all)]

pub mod algorithm;
pub mod buffer;
pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod hub;
pub mod provider;
pub mod repaint;
pub mod retention;
pub mod state;

// Re-export main types
pub use algorithm::{Algorithm, Frame, UpdatePolicy};
pub use buffer::{BufferAlgorithm, BufferList};
pub use cache::{OrderedCache, Slot, is_strictly_ordered};
pub use chain::{ChainProvider, Observer, Publisher, SubscriberId, Subscribers};
pub use config::{DEFAULT_MAX_CACHE_SIZE, RepaintMode, StreamConfig};
pub use error::StreamError;
pub use hub::Hub;
pub use provider::{Mutation, QuoteHub, Rejection, StreamProvider};
pub use retention::{Retention, RetentionNode, propagate_retention, retained_len};
pub use state::StateLog;
