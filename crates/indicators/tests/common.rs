#![allow(dead_code)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_types::Quote;

/// 2024-01-01 00:00:00 UTC
pub const START_NS: i64 = 1_704_067_200_000_000_000;
/// One minute
pub const STEP_NS: i64 = 60_000_000_000;

/// Deterministic random-walk quotes, one per minute.
pub fn random_quotes(len: usize, seed: u64) -> Vec<Quote> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut close: f64 = 100.0;
    (0..len)
        .map(|i| {
            let open = close;
            close = (close + rng.gen_range(-1.5..1.5)).max(1.0);
            let high = open.max(close) + rng.gen_range(0.0..0.8);
            let low = (open.min(close) - rng.gen_range(0.0..0.8)).max(0.5);
            let volume = rng.gen_range(100.0..1000.0);
            Quote::new(START_NS + i as i64 * STEP_NS, open, high, low, close, volume)
        })
        .collect()
}

/// Flat quote where every price equals `close`.
pub fn flat_quote(timestamp_ns: i64, close: f64) -> Quote {
    Quote::new(timestamp_ns, close, close, close, close, 0.0)
}

/// Bit patterns, so NaN compares equal to NaN.
pub fn bits(values: impl IntoIterator<Item = Option<f64>>) -> Vec<Option<u64>> {
    values.into_iter().map(|v| v.map(f64::to_bits)).collect()
}
