//! Relative Strength Index (RSI) indicator

use std::collections::VecDeque;

use strata_stream::{Algorithm, BufferAlgorithm, Frame, StateLog};
use strata_types::{Reusable, Series};

use crate::error::IndicatorError;
use crate::math::wilder;
use crate::traits::{Buffered, Indicator};

/// RSI output for one position.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RsiResult {
    /// Timestamp of the source item
    pub timestamp_ns: i64,
    /// RSI in [0, 100]; `None` during warmup or when undefined
    pub rsi: Option<f64>,
}

impl Series for RsiResult {
    fn timestamp_ns(&self) -> i64 {
        self.timestamp_ns
    }
}

impl Reusable for RsiResult {
    fn value(&self) -> Option<f64> {
        self.rsi
    }
}

/// Wilder-smoothed average gain and loss after one position.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RsiState {
    /// Average gain
    pub avg_gain: f64,
    /// Average loss
    pub avg_loss: f64,
}

impl RsiState {
    fn is_finite(&self) -> bool {
        self.avg_gain.is_finite() && self.avg_loss.is_finite()
    }

    /// RSI implied by this state; `None` when gain/loss is undefined.
    #[must_use]
    pub fn rsi(&self) -> Option<f64> {
        if (self.avg_gain / self.avg_loss).is_nan() {
            return None;
        }
        if self.avg_loss > 0.0 {
            let rs = self.avg_gain / self.avg_loss;
            return Some(100.0 - 100.0 / (1.0 + rs));
        }
        Some(100.0)
    }
}

/// Relative Strength Index (Wilder)
///
/// Seeds average gain/loss with the simple mean of the first `period`
/// changes, then smooths with `(prev * (n - 1) + x) / n`. A missing value
/// blanks the output and a NaN taints it; either way the averages are
/// re-seeded from the next clean window.
#[derive(Debug, Clone)]
pub struct RSI {
    period: usize,
    states: StateLog<Option<RsiState>>,
}

impl RSI {
    /// Creates a new RSI indicator with the given period.
    ///
    /// # Errors
    /// Returns `ParamOutOfRange` if `period` is 0.
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        let period = IndicatorError::require_at_least("period", period, 1)?;
        Ok(Self {
            period,
            states: StateLog::new(),
        })
    }

    /// Number of periods for the averages
    #[must_use]
    pub fn period(&self) -> usize {
        self.period
    }

    /// Averages recorded after the newest streamed position.
    #[must_use]
    pub fn state(&self) -> Option<RsiState> {
        self.states.last().copied().flatten()
    }
}

/// One RSI step at `index`.
///
/// `value_at(back)` returns the input value `back` positions before
/// `index`; it is never called with `back > period`.
fn step(
    prev: Option<RsiState>,
    index: usize,
    period: usize,
    value_at: impl Fn(usize) -> Option<f64>,
) -> (Option<f64>, Option<RsiState>) {
    if index < period {
        return (None, None);
    }

    if let Some(prev) = prev.filter(RsiState::is_finite) {
        let (Some(cur), Some(prior)) = (value_at(0), value_at(1)) else {
            return (None, None);
        };
        let change = cur - prior;
        if change.is_nan() {
            return (Some(f64::NAN), None);
        }
        let state = RsiState {
            avg_gain: wilder(prev.avg_gain, change.max(0.0), period),
            avg_loss: wilder(prev.avg_loss, (-change).max(0.0), period),
        };
        return (state.rsi(), Some(state));
    }

    let mut gain = 0.0;
    let mut loss = 0.0;
    for back in (0..period).rev() {
        let (Some(cur), Some(prior)) = (value_at(back), value_at(back + 1)) else {
            return (None, None);
        };
        let change = cur - prior;
        if change.is_nan() {
            return (Some(f64::NAN), None);
        }
        gain += change.max(0.0);
        loss += (-change).max(0.0);
    }
    let state = RsiState {
        avg_gain: gain / period as f64,
        avg_loss: loss / period as f64,
    };
    (state.rsi(), Some(state))
}

impl<I: Reusable> Indicator<I> for RSI {
    type Output = RsiResult;

    fn compute(&self, items: &[I]) -> Vec<RsiResult> {
        let mut results = Vec::with_capacity(items.len());
        let mut state = None;
        for (i, item) in items.iter().enumerate() {
            let (rsi, next) = step(state, i, self.period, |back| items[i - back].value());
            state = next;
            results.push(RsiResult {
                timestamp_ns: item.timestamp_ns(),
                rsi,
            });
        }
        results
    }

    fn name(&self) -> &str {
        "RSI"
    }

    fn warmup_periods(&self) -> usize {
        self.period
    }
}

impl<I: Reusable> Algorithm<I> for RSI {
    type Output = RsiResult;

    fn name(&self) -> String {
        format!("RSI({})", self.period)
    }

    fn min_cache_size(&self) -> usize {
        self.period + 1
    }

    fn transform(&mut self, frame: &Frame<'_, I, RsiResult>) -> RsiResult {
        let history = frame.history();
        let index = frame.index();
        let (rsi, state) = step(self.state(), index, self.period, |back| {
            history[index - back].value()
        });
        self.states.push(state);
        RsiResult {
            timestamp_ns: frame.item().timestamp_ns(),
            rsi,
        }
    }

    fn rollback(&mut self, _source: &[I], results: &[RsiResult]) {
        self.states.truncate(results.len());
    }

    fn prune(&mut self, count: usize) {
        self.states.prune(count);
    }
}

/// Incremental RSI over a bounded list.
#[derive(Debug, Clone)]
pub struct RsiBuffer {
    period: usize,
    values: VecDeque<Option<f64>>,
    seen: usize,
    state: Option<RsiState>,
}

impl<I: Reusable> BufferAlgorithm<I> for RsiBuffer {
    type Output = RsiResult;

    fn name(&self) -> String {
        format!("RSI({})", self.period)
    }

    fn push(&mut self, item: &I, results: &mut Vec<RsiResult>) {
        if self.values.len() == self.period + 1 {
            self.values.pop_front();
        }
        self.values.push_back(item.value());

        let values = &self.values;
        let newest = values.len() - 1;
        let (rsi, state) = step(self.state, self.seen, self.period, |back| {
            values.get(newest - back).copied().flatten()
        });
        self.state = state;
        self.seen += 1;
        results.push(RsiResult {
            timestamp_ns: item.timestamp_ns(),
            rsi,
        });
    }

    fn clear(&mut self) {
        self.values.clear();
        self.seen = 0;
        self.state = None;
    }
}

impl<I: Reusable> Buffered<I> for RSI {
    type Buffer = RsiBuffer;

    fn buffer(&self) -> RsiBuffer {
        RsiBuffer {
            period: self.period,
            values: VecDeque::with_capacity(self.period + 1),
            seen: 0,
            state: None,
        }
    }
}
