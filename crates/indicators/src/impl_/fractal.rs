//! Williams Fractal indicator

use std::collections::VecDeque;

use strata_stream::{Algorithm, BufferAlgorithm, Frame, UpdatePolicy};
use strata_types::{Quote, Series};

use crate::error::IndicatorError;
use crate::traits::{Buffered, EndType, Indicator};

/// Fractal output for one quote.
///
/// A position is only evaluated once `right_span` later quotes exist, so the
/// newest results are always empty.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FractalResult {
    /// Timestamp of the quote
    pub timestamp_ns: i64,
    /// High above every wing high
    pub fractal_bear: Option<f64>,
    /// Low below every wing low
    pub fractal_bull: Option<f64>,
}

impl FractalResult {
    fn empty(timestamp_ns: i64) -> Self {
        Self {
            timestamp_ns,
            fractal_bear: None,
            fractal_bull: None,
        }
    }
}

impl Series for FractalResult {
    fn timestamp_ns(&self) -> i64 {
        self.timestamp_ns
    }
}

/// Williams Fractal
///
/// A quote is a bearish fractal when its high is strictly above the highs of
/// the `left_span` quotes before it and the `right_span` quotes after it, and
/// a bullish fractal when its low is strictly below all their lows.
#[derive(Debug, Clone)]
pub struct Fractal {
    left_span: usize,
    right_span: usize,
    end_type: EndType,
}

impl Fractal {
    /// Creates a new Fractal indicator.
    ///
    /// # Errors
    /// Returns `ParamOutOfRange` if either span is below 2.
    pub fn new(left_span: usize, right_span: usize, end_type: EndType) -> Result<Self, IndicatorError> {
        let left_span = IndicatorError::require_at_least("left_span", left_span, 2)?;
        let right_span = IndicatorError::require_at_least("right_span", right_span, 2)?;
        Ok(Self {
            left_span,
            right_span,
            end_type,
        })
    }

    /// Same span on both sides.
    ///
    /// # Errors
    /// Returns `ParamOutOfRange` if `span` is below 2.
    pub fn with_span(span: usize, end_type: EndType) -> Result<Self, IndicatorError> {
        Self::new(span, span, end_type)
    }

    /// Quotes compared before the center
    #[must_use]
    pub fn left_span(&self) -> usize {
        self.left_span
    }

    /// Quotes compared after the center
    #[must_use]
    pub fn right_span(&self) -> usize {
        self.right_span
    }

    /// Prices compared
    #[must_use]
    pub fn end_type(&self) -> EndType {
        self.end_type
    }

    fn label(&self) -> String {
        format!("FRACTAL({},{},{})", self.left_span, self.right_span, self.end_type)
    }

    fn evaluate<'a>(&self, center: &Quote, wings: impl Iterator<Item = &'a Quote>) -> FractalResult {
        let eval_high = self.end_type.high(center);
        let eval_low = self.end_type.low(center);
        let mut is_high = true;
        let mut is_low = true;

        for wing in wings {
            if eval_high <= self.end_type.high(wing) {
                is_high = false;
            }
            if eval_low >= self.end_type.low(wing) {
                is_low = false;
            }
        }

        FractalResult {
            timestamp_ns: center.timestamp_ns,
            fractal_bear: is_high.then_some(eval_high),
            fractal_bull: is_low.then_some(eval_low),
        }
    }
}

impl Indicator<Quote> for Fractal {
    type Output = FractalResult;

    fn compute(&self, quotes: &[Quote]) -> Vec<FractalResult> {
        quotes
            .iter()
            .enumerate()
            .map(|(i, quote)| {
                if i < self.left_span || i + self.right_span >= quotes.len() {
                    return FractalResult::empty(quote.timestamp_ns);
                }
                let wings = quotes[i - self.left_span..i]
                    .iter()
                    .chain(&quotes[i + 1..=i + self.right_span]);
                self.evaluate(quote, wings)
            })
            .collect()
    }

    fn name(&self) -> &str {
        "FRACTAL"
    }

    fn warmup_periods(&self) -> usize {
        self.left_span
    }

    fn required_history(&self) -> usize {
        self.left_span + self.right_span + 1
    }
}

impl Algorithm<Quote> for Fractal {
    type Output = FractalResult;

    fn name(&self) -> String {
        self.label()
    }

    fn min_cache_size(&self) -> usize {
        self.left_span + self.right_span + 1
    }

    fn policy(&self) -> UpdatePolicy {
        UpdatePolicy::Repaint
    }

    fn transform(&mut self, frame: &Frame<'_, Quote, FractalResult>) -> FractalResult {
        self.compute(frame.history())
            .pop()
            .unwrap_or_else(|| FractalResult::empty(frame.item().timestamp_ns))
    }

    fn recompute(&mut self, source: &[Quote]) -> Vec<FractalResult> {
        self.compute(source)
    }
}

/// Incremental fractals over a bounded list.
///
/// Each new quote confirms the position `right_span` quotes back; that
/// result is rewritten in place.
#[derive(Debug, Clone)]
pub struct FractalBuffer {
    fractal: Fractal,
    window: VecDeque<Quote>,
    last_bear: Option<usize>,
    last_bull: Option<usize>,
}

impl FractalBuffer {
    /// Result index of the newest confirmed bearish fractal still retained.
    #[must_use]
    pub fn last_bear(&self) -> Option<usize> {
        self.last_bear
    }

    /// Result index of the newest confirmed bullish fractal still retained.
    #[must_use]
    pub fn last_bull(&self) -> Option<usize> {
        self.last_bull
    }
}

impl BufferAlgorithm<Quote> for FractalBuffer {
    type Output = FractalResult;

    fn name(&self) -> String {
        self.fractal.label()
    }

    fn lookback(&self) -> usize {
        self.fractal.right_span + 1
    }

    fn push(&mut self, quote: &Quote, results: &mut Vec<FractalResult>) {
        let left = self.fractal.left_span;
        let span = left + self.fractal.right_span + 1;
        if self.window.len() == span {
            self.window.pop_front();
        }
        self.window.push_back(*quote);
        results.push(FractalResult::empty(quote.timestamp_ns));

        if self.window.len() < span {
            return;
        }
        let Some(target) = results.len().checked_sub(self.fractal.right_span + 1) else {
            return;
        };

        let center = &self.window[left];
        let wings = self
            .window
            .iter()
            .enumerate()
            .filter(|(k, _)| *k != left)
            .map(|(_, q)| q);
        let result = self.fractal.evaluate(center, wings);

        if result.fractal_bear.is_some() {
            self.last_bear = Some(target);
        }
        if result.fractal_bull.is_some() {
            self.last_bull = Some(target);
        }
        results[target] = result;
    }

    fn prune(&mut self, count: usize) {
        self.last_bear = self.last_bear.and_then(|i| i.checked_sub(count));
        self.last_bull = self.last_bull.and_then(|i| i.checked_sub(count));
    }

    fn clear(&mut self) {
        self.window.clear();
        self.last_bear = None;
        self.last_bull = None;
    }
}

impl Buffered<Quote> for Fractal {
    type Buffer = FractalBuffer;

    fn buffer(&self) -> FractalBuffer {
        FractalBuffer {
            fractal: self.clone(),
            window: VecDeque::with_capacity(self.left_span + self.right_span + 1),
            last_bear: None,
            last_bull: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_stream::{ChainProvider, QuoteHub};

    fn make_quote(ts: i64, high: f64, low: f64) -> Quote {
        let mid = (high + low) / 2.0;
        Quote::new(ts, mid, high, low, mid, 0.0)
    }

    /// A peak at index 2 and a trough at index 6.
    fn sample() -> Vec<Quote> {
        [
            (10.0, 9.0),
            (11.0, 10.0),
            (14.0, 12.0),
            (12.0, 10.5),
            (11.0, 9.5),
            (10.0, 8.0),
            (9.0, 6.0),
            (10.0, 8.5),
            (11.0, 9.0),
            (12.0, 10.0),
        ]
        .iter()
        .enumerate()
        .map(|(i, (h, l))| make_quote(i as i64, *h, *l))
        .collect()
    }

    #[test]
    fn test_fractal_peak_and_trough() {
        let fractal = Fractal::with_span(2, EndType::HighLow).unwrap();
        let result = fractal.compute(&sample());

        assert_eq!(result[2].fractal_bear, Some(14.0));
        assert!(result[2].fractal_bull.is_none());
        assert_eq!(result[6].fractal_bull, Some(6.0));
        assert!(result[6].fractal_bear.is_none());

        let marked = result
            .iter()
            .filter(|r| r.fractal_bear.is_some() || r.fractal_bull.is_some())
            .count();
        assert_eq!(marked, 2);
        // No right context yet
        assert!(result[8..].iter().all(|r| *r == FractalResult::empty(r.timestamp_ns)));
    }

    #[test]
    fn test_fractal_ties_are_not_fractals() {
        let quotes: Vec<Quote> = (0..5).map(|i| make_quote(i, 10.0, 9.0)).collect();
        let result = Fractal::with_span(2, EndType::HighLow).unwrap().compute(&quotes);

        assert!(result[2].fractal_bear.is_none());
        assert!(result[2].fractal_bull.is_none());
    }

    #[test]
    fn test_fractal_rejects_short_spans() {
        assert!(Fractal::new(1, 2, EndType::HighLow).is_err());
        assert!(Fractal::new(2, 1, EndType::Close).is_err());
    }

    #[test]
    fn test_fractal_hub_repaints_confirmed_positions() {
        let quotes = sample();
        let fractal = Fractal::with_span(2, EndType::HighLow).unwrap();

        let provider = QuoteHub::new();
        let hub = provider.subscribe(fractal.clone());
        assert_eq!(hub.name(), "FRACTAL(2,2,HIGHLOW)");
        assert_eq!(hub.min_cache_size(), 5);

        provider.add_batch(quotes[..4].iter().copied());
        assert!(hub.get(2).is_some_and(|r| r.fractal_bear.is_none()));

        // The second quote after the peak confirms it.
        provider.add(quotes[4]);
        assert_eq!(hub.get(2).and_then(|r| r.fractal_bear), Some(14.0));

        provider.add_batch(quotes[5..].iter().copied());
        assert_eq!(&*hub.results(), fractal.compute(&quotes).as_slice());
    }

    #[test]
    fn test_fractal_buffer_matches_batch_and_tracks_last() {
        let quotes = sample();
        let fractal = Fractal::with_span(2, EndType::HighLow).unwrap();
        let batch = fractal.compute(&quotes);

        let mut list = fractal.buffer_list(100).unwrap();
        list.add_batch(quotes.iter().copied());
        assert_eq!(list.results(), batch.as_slice());
        assert_eq!(list.algorithm().last_bear(), Some(2));
        assert_eq!(list.algorithm().last_bull(), Some(6));
    }

    #[test]
    fn test_fractal_buffer_prune_shifts_last_indices() {
        let quotes = sample();
        let fractal = Fractal::with_span(2, EndType::HighLow).unwrap();

        let mut list = fractal.buffer_list(5).unwrap();
        list.add_batch(quotes.iter().copied());

        // Ten quotes, five kept: the peak at 2 is gone, the trough moved to 1.
        assert_eq!(list.pruned(), 5);
        assert_eq!(list.algorithm().last_bear(), None);
        assert_eq!(list.algorithm().last_bull(), Some(1));
        assert_eq!(list.results()[1].fractal_bull, Some(6.0));
    }
}
