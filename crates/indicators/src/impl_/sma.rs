//! Simple Moving Average (SMA) indicator

use std::collections::VecDeque;

use strata_stream::{Algorithm, BufferAlgorithm, Frame};
use strata_types::{Reusable, Series};

use crate::error::IndicatorError;
use crate::math::{mean_values, trailing};
use crate::traits::{Buffered, Indicator};

/// SMA output for one position.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SmaResult {
    /// Timestamp of the source item
    pub timestamp_ns: i64,
    /// Window mean; `None` during warmup or over a missing value
    pub sma: Option<f64>,
}

impl Series for SmaResult {
    fn timestamp_ns(&self) -> i64 {
        self.timestamp_ns
    }
}

impl Reusable for SmaResult {
    fn value(&self) -> Option<f64> {
        self.sma
    }
}

/// Simple Moving Average
///
/// Calculates the arithmetic mean of the last N values.
#[derive(Debug, Clone)]
pub struct SMA {
    period: usize,
}

impl SMA {
    /// Creates a new SMA indicator with the given period.
    ///
    /// # Errors
    /// Returns `ParamOutOfRange` if `period` is 0.
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        let period = IndicatorError::require_at_least("period", period, 1)?;
        Ok(Self { period })
    }

    /// Number of periods for the moving average
    #[must_use]
    pub fn period(&self) -> usize {
        self.period
    }

    fn at<I: Reusable>(&self, window: Option<&[I]>) -> Option<f64> {
        window.and_then(|w| mean_values(w.iter().map(Reusable::value), self.period))
    }
}

impl<I: Reusable> Indicator<I> for SMA {
    type Output = SmaResult;

    fn compute(&self, items: &[I]) -> Vec<SmaResult> {
        (0..items.len())
            .map(|i| SmaResult {
                timestamp_ns: items[i].timestamp_ns(),
                sma: self.at(trailing(items, i, self.period)),
            })
            .collect()
    }

    fn name(&self) -> &str {
        "SMA"
    }

    fn warmup_periods(&self) -> usize {
        self.period - 1
    }
}

impl<I: Reusable> Algorithm<I> for SMA {
    type Output = SmaResult;

    fn name(&self) -> String {
        format!("SMA({})", self.period)
    }

    fn min_cache_size(&self) -> usize {
        self.period
    }

    fn transform(&mut self, frame: &Frame<'_, I, SmaResult>) -> SmaResult {
        SmaResult {
            timestamp_ns: frame.item().timestamp_ns(),
            sma: self.at(frame.window(self.period)),
        }
    }
}

/// Incremental SMA over a bounded list.
#[derive(Debug, Clone)]
pub struct SmaBuffer {
    period: usize,
    window: VecDeque<Option<f64>>,
}

impl<I: Reusable> BufferAlgorithm<I> for SmaBuffer {
    type Output = SmaResult;

    fn name(&self) -> String {
        format!("SMA({})", self.period)
    }

    fn push(&mut self, item: &I, results: &mut Vec<SmaResult>) {
        if self.window.len() == self.period {
            self.window.pop_front();
        }
        self.window.push_back(item.value());

        let sma = (self.window.len() == self.period)
            .then(|| mean_values(self.window.iter().copied(), self.period))
            .flatten();
        results.push(SmaResult {
            timestamp_ns: item.timestamp_ns(),
            sma,
        });
    }

    fn clear(&mut self) {
        self.window.clear();
    }
}

impl<I: Reusable> Buffered<I> for SMA {
    type Buffer = SmaBuffer;

    fn buffer(&self) -> SmaBuffer {
        SmaBuffer {
            period: self.period,
            window: VecDeque::with_capacity(self.period),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_stream::{ChainProvider, StreamProvider};
    use strata_types::TimeValue;

    fn make_points(values: &[f64]) -> Vec<TimeValue> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| TimeValue::new(i as i64, *v))
            .collect()
    }

    fn values(results: &[SmaResult]) -> Vec<Option<f64>> {
        results.iter().map(|r| r.sma).collect()
    }

    #[test]
    fn test_sma_basic() {
        let points = make_points(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        let sma = SMA::new(3).unwrap();
        let result = sma.compute(&points);

        assert!(result[0].sma.is_none());
        assert!(result[1].sma.is_none());
        assert!((result[2].sma.unwrap() - 2.0).abs() < 1e-10); // (1+2+3)/3 = 2.0
        assert!((result[3].sma.unwrap() - 3.0).abs() < 1e-10); // (2+3+4)/3 = 3.0
        assert!((result[4].sma.unwrap() - 4.0).abs() < 1e-10); // (3+4+5)/3 = 4.0
    }

    #[test]
    fn test_sma_period_one_matches_value() {
        let points = make_points(&[1.5, 2.5, 3.0]);

        let result = SMA::new(1).unwrap().compute(&points);

        for (point, r) in points.iter().zip(result.iter()) {
            assert_eq!(r.sma, Some(point.value));
        }
    }

    #[test]
    fn test_sma_rejects_zero_period() {
        assert!(matches!(
            SMA::new(0),
            Err(IndicatorError::ParamOutOfRange { .. })
        ));
    }

    #[test]
    fn test_sma_try_compute_short_input() {
        let sma = SMA::new(5).unwrap();
        let err = sma.try_compute(&make_points(&[1.0, 2.0])).unwrap_err();

        assert!(matches!(
            err,
            IndicatorError::InsufficientData {
                required: 5,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_sma_nan_contaminates_window_only() {
        let points = make_points(&[1.0, f64::NAN, 3.0, 4.0, 5.0]);
        let result = SMA::new(2).unwrap().compute(&points);

        assert!(result[1].sma.is_some_and(f64::is_nan));
        assert!(result[2].sma.is_some_and(f64::is_nan));
        assert_eq!(result[3].sma, Some(3.5));
    }

    #[test]
    fn test_sma_hub_and_buffer_match_batch() {
        let points = make_points(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0]);
        let sma = SMA::new(3).unwrap();
        let batch = sma.compute(&points);

        let provider: StreamProvider<TimeValue> = StreamProvider::new();
        let hub = provider.subscribe(sma.clone());
        for point in &points {
            provider.add(*point);
        }
        assert_eq!(values(&hub.results()), values(&batch));
        assert_eq!(hub.name(), "SMA(3)");

        let mut list = sma.buffer_list(100).unwrap();
        list.add_batch(points.iter().copied());
        assert_eq!(values(list.results()), values(&batch));
    }
}
