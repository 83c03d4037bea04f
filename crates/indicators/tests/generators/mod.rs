#![allow(dead_code)]

use proptest::prelude::*;
use proptest::sample::Index;
use strata_stream::{Mutation, QuoteHub};
use strata_types::Quote;

use crate::common::{START_NS, STEP_NS, flat_quote};

/// One provider mutation; positions are resolved against the live cache.
#[derive(Debug, Clone)]
pub enum Op {
    Append { close: f64 },
    Insert { pos: Index, close: f64 },
    Revise { pos: Index, close: f64 },
    Remove { pos: Index },
}

impl Op {
    /// Applies the mutation to `provider`.
    pub fn apply(&self, provider: &QuoteHub) -> Mutation {
        let len = provider.len();
        match self {
            Op::Append { close } => {
                let ts = provider.last().map_or(START_NS, |q| q.timestamp_ns + STEP_NS);
                provider.add(flat_quote(ts, *close))
            }
            Op::Insert { pos, close } => match provider.get(pos.index(len.max(1))) {
                Some(anchor) => provider.insert(flat_quote(anchor.timestamp_ns - 1, *close)),
                None => Mutation::NotFound,
            },
            Op::Revise { pos, close } => match provider.get(pos.index(len.max(1))) {
                Some(quote) => provider.insert(quote.with_close(*close)),
                None => Mutation::NotFound,
            },
            Op::Remove { pos } => provider.remove_at(pos.index(len.max(1))),
        }
    }
}

/// Random-walk quotes with monotonic one-minute timestamps.
pub fn quote_sequence(len: impl Into<prop::collection::SizeRange>) -> impl Strategy<Value = Vec<Quote>> {
    prop::collection::vec((-1.0f64..1.0, 0.0f64..0.5), len).prop_map(|steps| {
        let mut close = 100.0;
        steps
            .into_iter()
            .enumerate()
            .map(|(i, (delta, spread))| {
                let open = close;
                close += delta;
                Quote::new(
                    START_NS + i as i64 * STEP_NS,
                    open,
                    open.max(close) + spread,
                    open.min(close) - spread,
                    close,
                    100.0,
                )
            })
            .collect()
    })
}

/// Appends, ordered inserts, revisions and removals in roughly equal measure.
pub fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (90.0f64..110.0).prop_map(|close| Op::Append { close }),
        (any::<Index>(), 90.0f64..110.0).prop_map(|(pos, close)| Op::Insert { pos, close }),
        (any::<Index>(), 90.0f64..110.0).prop_map(|(pos, close)| Op::Revise { pos, close }),
        any::<Index>().prop_map(|pos| Op::Remove { pos }),
    ]
}
