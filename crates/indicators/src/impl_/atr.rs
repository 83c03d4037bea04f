//! Average True Range (ATR) indicator with Wilder smoothing

use std::collections::VecDeque;

use strata_stream::{Algorithm, BufferAlgorithm, Frame};
use strata_types::{Quote, Reusable, Series};

use crate::error::IndicatorError;
use crate::math::{mean_values, wilder};
use crate::traits::{Buffered, Indicator};

/// ATR output for one quote.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AtrResult {
    /// Timestamp of the quote
    pub timestamp_ns: i64,
    /// True range
    pub tr: f64,
    /// Average true range; `None` during warmup
    pub atr: Option<f64>,
    /// ATR as a percentage of close; `None` when close is 0
    pub atrp: Option<f64>,
}

impl Series for AtrResult {
    fn timestamp_ns(&self) -> i64 {
        self.timestamp_ns
    }
}

impl Reusable for AtrResult {
    fn value(&self) -> Option<f64> {
        self.atr
    }
}

/// Average True Range (Wilder)
///
/// Uses Wilder's smoothing method: ATR = (prev_ATR * (n-1) + TR) / n
/// This is different from a simple moving average and provides a more
/// responsive measure of volatility. The first ATR is the mean of the first
/// `period` true ranges; it is re-seeded the same way after a NaN.
#[derive(Debug, Clone)]
pub struct ATR {
    period: usize,
}

impl ATR {
    /// Creates a new ATR indicator with the given period.
    ///
    /// # Errors
    /// Returns `ParamOutOfRange` if `period` is 0.
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        let period = IndicatorError::require_at_least("period", period, 1)?;
        Ok(Self { period })
    }

    /// Number of periods for ATR calculation
    #[must_use]
    pub fn period(&self) -> usize {
        self.period
    }

    /// Calculates True Range for a quote given the previous one.
    ///
    /// TR = max(High - Low, |High - Prev_Close|, |Low - Prev_Close|)
    /// The first quote has no previous close, so its TR is High - Low.
    #[inline]
    fn true_range(quote: &Quote, prior: Option<&Quote>) -> f64 {
        let hl = quote.high - quote.low;
        let Some(prior) = prior else {
            return hl;
        };
        let hc = (quote.high - prior.close).abs();
        let lc = (quote.low - prior.close).abs();
        if hl.is_nan() || hc.is_nan() || lc.is_nan() {
            return f64::NAN;
        }
        hl.max(hc).max(lc)
    }

    /// Builds the result at `index` from the previous ATR and the TRs of
    /// the `period - 1` positions before it.
    fn result(
        &self,
        quote: &Quote,
        index: usize,
        tr: f64,
        prev_atr: Option<f64>,
        prior_trs: impl FnOnce() -> Option<Vec<f64>>,
    ) -> AtrResult {
        let atr = if index + 1 < self.period {
            None
        } else {
            match prev_atr {
                Some(prev) if prev.is_finite() => Some(wilder(prev, tr, self.period)),
                _ => prior_trs().and_then(|trs| {
                    mean_values(trs.into_iter().chain([tr]).map(Some), self.period)
                }),
            }
        };
        let atrp = atr.and_then(|a| (quote.close != 0.0).then_some(a / quote.close * 100.0));
        AtrResult {
            timestamp_ns: quote.timestamp_ns,
            tr,
            atr,
            atrp,
        }
    }

    fn trs_before(results: &[AtrResult], len: usize) -> Option<Vec<f64>> {
        let start = results.len().checked_sub(len)?;
        Some(results[start..].iter().map(|r| r.tr).collect())
    }
}

impl Indicator<Quote> for ATR {
    type Output = AtrResult;

    fn compute(&self, quotes: &[Quote]) -> Vec<AtrResult> {
        let mut results: Vec<AtrResult> = Vec::with_capacity(quotes.len());
        for (i, quote) in quotes.iter().enumerate() {
            let prior = i.checked_sub(1).map(|p| &quotes[p]);
            let tr = Self::true_range(quote, prior);
            let prev_atr = results.last().and_then(|r| r.atr);
            let result = self.result(quote, i, tr, prev_atr, || {
                Self::trs_before(&results, self.period - 1)
            });
            results.push(result);
        }
        results
    }

    fn name(&self) -> &str {
        "ATR"
    }

    fn warmup_periods(&self) -> usize {
        self.period - 1
    }
}

impl Algorithm<Quote> for ATR {
    type Output = AtrResult;

    fn name(&self) -> String {
        format!("ATR({})", self.period)
    }

    fn min_cache_size(&self) -> usize {
        self.period + 1
    }

    fn transform(&mut self, frame: &Frame<'_, Quote, AtrResult>) -> AtrResult {
        let tr = Self::true_range(frame.item(), frame.prior());
        let prev_atr = frame.previous().and_then(|r| r.atr);
        self.result(frame.item(), frame.index(), tr, prev_atr, || {
            Self::trs_before(frame.results(), self.period - 1)
        })
    }
}

/// Incremental ATR over a bounded list.
#[derive(Debug, Clone)]
pub struct AtrBuffer {
    atr: ATR,
    prior: Option<Quote>,
    trs: VecDeque<f64>,
    seen: usize,
    last_atr: Option<f64>,
}

impl BufferAlgorithm<Quote> for AtrBuffer {
    type Output = AtrResult;

    fn name(&self) -> String {
        format!("ATR({})", self.atr.period)
    }

    fn push(&mut self, quote: &Quote, results: &mut Vec<AtrResult>) {
        let period = self.atr.period;
        let tr = ATR::true_range(quote, self.prior.as_ref());
        let trs = &self.trs;
        let result = self.atr.result(quote, self.seen, tr, self.last_atr, || {
            (trs.len() == period - 1).then(|| trs.iter().copied().collect())
        });

        if period > 1 {
            if self.trs.len() == period - 1 {
                self.trs.pop_front();
            }
            self.trs.push_back(tr);
        }
        self.prior = Some(*quote);
        self.last_atr = result.atr;
        self.seen += 1;
        results.push(result);
    }

    fn clear(&mut self) {
        self.prior = None;
        self.trs.clear();
        self.seen = 0;
        self.last_atr = None;
    }
}

impl Buffered<Quote> for ATR {
    type Buffer = AtrBuffer;

    fn buffer(&self) -> AtrBuffer {
        AtrBuffer {
            atr: self.clone(),
            prior: None,
            trs: VecDeque::with_capacity(self.period),
            seen: 0,
            last_atr: None,
        }
    }
}
