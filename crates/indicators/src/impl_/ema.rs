//! Exponential Moving Average (EMA) indicator

use std::collections::VecDeque;

use strata_stream::{Algorithm, BufferAlgorithm, Frame};
use strata_types::{Reusable, Series};

use crate::error::IndicatorError;
use crate::math::{mean_values, trailing};
use crate::traits::{Buffered, Indicator};

/// EMA output for one position.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EmaResult {
    /// Timestamp of the source item
    pub timestamp_ns: i64,
    /// Smoothed value; `None` until a clean seed window is available
    pub ema: Option<f64>,
}

impl Series for EmaResult {
    fn timestamp_ns(&self) -> i64 {
        self.timestamp_ns
    }
}

impl Reusable for EmaResult {
    fn value(&self) -> Option<f64> {
        self.ema
    }
}

/// Exponential Moving Average
///
/// Uses smoothing factor α = 2 / (period + 1). The first value is seeded
/// with the mean of the first `period` values; the same seed is taken again
/// whenever the previous EMA is missing or not finite, so a bad input only
/// taints the output until a clean window has passed.
#[derive(Debug, Clone)]
pub struct EMA {
    period: usize,
    alpha: f64,
}

impl EMA {
    /// Creates a new EMA indicator with the given period.
    ///
    /// # Errors
    /// Returns `ParamOutOfRange` if `period` is 0.
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        let period = IndicatorError::require_at_least("period", period, 1)?;
        Ok(Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
        })
    }

    /// Number of periods for the EMA
    #[must_use]
    pub fn period(&self) -> usize {
        self.period
    }

    /// Smoothing factor
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

/// One EMA step; `seed` yields the window mean when a (re)seed is needed.
fn step(
    prev: Option<f64>,
    value: Option<f64>,
    alpha: f64,
    seed: impl FnOnce() -> Option<f64>,
) -> Option<f64> {
    match prev {
        Some(p) if p.is_finite() => value.map(|v| p + alpha * (v - p)),
        _ => seed(),
    }
}

impl<I: Reusable> Indicator<I> for EMA {
    type Output = EmaResult;

    fn compute(&self, items: &[I]) -> Vec<EmaResult> {
        let mut results: Vec<EmaResult> = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let prev = results.last().and_then(|r| r.ema);
            let ema = step(prev, item.value(), self.alpha, || {
                trailing(items, i, self.period)
                    .and_then(|w| mean_values(w.iter().map(Reusable::value), self.period))
            });
            results.push(EmaResult {
                timestamp_ns: item.timestamp_ns(),
                ema,
            });
        }
        results
    }

    fn name(&self) -> &str {
        "EMA"
    }

    fn warmup_periods(&self) -> usize {
        self.period - 1
    }
}

impl<I: Reusable> Algorithm<I> for EMA {
    type Output = EmaResult;

    fn name(&self) -> String {
        format!("EMA({})", self.period)
    }

    fn min_cache_size(&self) -> usize {
        self.period
    }

    fn transform(&mut self, frame: &Frame<'_, I, EmaResult>) -> EmaResult {
        let prev = frame.previous().and_then(|r| r.ema);
        let ema = step(prev, frame.item().value(), self.alpha, || {
            frame
                .window(self.period)
                .and_then(|w| mean_values(w.iter().map(Reusable::value), self.period))
        });
        EmaResult {
            timestamp_ns: frame.item().timestamp_ns(),
            ema,
        }
    }
}

/// Incremental EMA over a bounded list.
#[derive(Debug, Clone)]
pub struct EmaBuffer {
    period: usize,
    alpha: f64,
    window: VecDeque<Option<f64>>,
    last: Option<f64>,
}

impl<I: Reusable> BufferAlgorithm<I> for EmaBuffer {
    type Output = EmaResult;

    fn name(&self) -> String {
        format!("EMA({})", self.period)
    }

    fn push(&mut self, item: &I, results: &mut Vec<EmaResult>) {
        if self.window.len() == self.period {
            self.window.pop_front();
        }
        self.window.push_back(item.value());

        let window = &self.window;
        let period = self.period;
        let ema = step(self.last, item.value(), self.alpha, || {
            (window.len() == period)
                .then(|| mean_values(window.iter().copied(), period))
                .flatten()
        });
        self.last = ema;
        results.push(EmaResult {
            timestamp_ns: item.timestamp_ns(),
            ema,
        });
    }

    fn clear(&mut self) {
        self.window.clear();
        self.last = None;
    }
}

impl<I: Reusable> Buffered<I> for EMA {
    type Buffer = EmaBuffer;

    fn buffer(&self) -> EmaBuffer {
        EmaBuffer {
            period: self.period,
            alpha: self.alpha,
            window: VecDeque::with_capacity(self.period),
            last: None,
        }
    }
}
