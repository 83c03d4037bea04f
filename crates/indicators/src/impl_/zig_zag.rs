//! ZigZag indicator
//!
//! Connects swing highs and lows that differ by at least a percentage
//! threshold. The newest swing is not known until price has reversed far
//! enough, so earlier output changes as data arrives: hubs run it with the
//! repaint policy.

use strata_stream::{Algorithm, Frame, UpdatePolicy};
use strata_types::{Quote, Reusable, Series};

use crate::error::IndicatorError;
use crate::traits::{EndType, Indicator};

/// Swing direction of a confirmed ZigZag point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PointType {
    /// Swing high
    #[serde(rename = "H")]
    High,
    /// Swing low
    #[serde(rename = "L")]
    Low,
}

/// ZigZag output for one quote.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ZigZagResult {
    /// Timestamp of the quote
    pub timestamp_ns: i64,
    /// Line value, interpolated between swing points
    pub zig_zag: Option<f64>,
    /// Set on confirmed swing points only
    pub point_type: Option<PointType>,
    /// Line through the last two swing highs
    pub retrace_high: Option<f64>,
    /// Line through the last two swing lows
    pub retrace_low: Option<f64>,
}

impl ZigZagResult {
    fn empty(timestamp_ns: i64) -> Self {
        Self {
            timestamp_ns,
            zig_zag: None,
            point_type: None,
            retrace_high: None,
            retrace_low: None,
        }
    }
}

impl Series for ZigZagResult {
    fn timestamp_ns(&self) -> i64 {
        self.timestamp_ns
    }
}

impl Reusable for ZigZagResult {
    fn value(&self) -> Option<f64> {
        self.zig_zag
    }
}

/// A swing point; `index` is 1-based.
///
/// `kind` is `None` for the provisional starting point and for the
/// unconfirmed end point.
#[derive(Debug, Clone, Copy)]
struct Pivot {
    index: usize,
    value: f64,
    kind: Option<PointType>,
}

fn at_least(change: Option<f64>, threshold: f64) -> bool {
    change.is_some_and(|c| c >= threshold)
}

fn greater(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

/// Relative change, undefined from a zero base.
fn ratio(delta: f64, base: f64) -> Option<f64> {
    (base != 0.0).then_some(delta / base)
}

/// ZigZag
///
/// Marks swing highs and lows whose reversal exceeds `percent_change`,
/// draws straight lines between them, and retrace lines through
/// consecutive highs and consecutive lows.
#[derive(Debug, Clone)]
pub struct ZigZag {
    end_type: EndType,
    percent_change: f64,
}

impl ZigZag {
    /// Creates a new ZigZag indicator.
    ///
    /// # Errors
    /// Returns `InvalidParams` if `percent_change` is not finite and
    /// `ParamOutOfRange` if it is not positive.
    pub fn new(end_type: EndType, percent_change: f64) -> Result<Self, IndicatorError> {
        if !percent_change.is_finite() {
            return Err(IndicatorError::invalid_params(format!(
                "percent_change must be finite, got {percent_change}"
            )));
        }
        if percent_change <= 0.0 {
            return Err(IndicatorError::param_out_of_range(
                "percent_change",
                percent_change,
                f64::MIN_POSITIVE,
                f64::MAX,
            ));
        }
        Ok(Self {
            end_type,
            percent_change,
        })
    }

    /// Prices evaluated for swings
    #[must_use]
    pub fn end_type(&self) -> EndType {
        self.end_type
    }

    /// Minimum reversal, in percent
    #[must_use]
    pub fn percent_change(&self) -> f64 {
        self.percent_change
    }

    fn eval(&self, quote: &Quote) -> (f64, f64) {
        (self.end_type.high(quote), self.end_type.low(quote))
    }

    /// Finds the direction of the first swing from the first quote.
    fn initial_point(&self, quotes: &[Quote], threshold: f64) -> (Pivot, Pivot, Pivot) {
        let first = &quotes[0];
        let (high, low) = self.eval(first);
        let last_high = Pivot {
            index: 1,
            value: high,
            kind: Some(PointType::High),
        };
        let last_low = Pivot {
            index: 1,
            value: low,
            kind: Some(PointType::Low),
        };
        let mut last_point = Pivot {
            index: 1,
            value: first.close,
            kind: None,
        };

        for quote in quotes {
            let (high, low) = self.eval(quote);
            let up = ratio(high - last_low.value, last_low.value);
            let down = ratio(last_high.value - low, last_high.value);

            if at_least(up, threshold) && greater(up, down) {
                last_point = last_low;
                break;
            }
            if at_least(down, threshold) && greater(down, up) {
                last_point = last_high;
                break;
            }
        }
        (last_point, last_high, last_low)
    }

    /// Scans forward from `last` for the extreme before the next reversal.
    fn next_point(&self, quotes: &[Quote], threshold: f64, last: Pivot) -> Pivot {
        let trend_up = last.kind == Some(PointType::Low);
        let mut extreme = Pivot {
            index: last.index,
            value: last.value,
            kind: Some(if trend_up {
                PointType::High
            } else {
                PointType::Low
            }),
        };

        for (i, quote) in quotes.iter().enumerate().skip(last.index) {
            let index = i + 1;
            let (high, low) = self.eval(quote);

            let change = if trend_up {
                if high >= extreme.value {
                    extreme.index = index;
                    extreme.value = high;
                    Some(0.0)
                } else {
                    ratio(extreme.value - low, extreme.value)
                }
            } else if low <= extreme.value {
                extreme.index = index;
                extreme.value = low;
                Some(0.0)
            } else {
                ratio(high - extreme.value, extreme.value)
            };

            if at_least(change, threshold) {
                return extreme;
            }

            // Unconfirmed end point
            if index == quotes.len() {
                extreme.index = index;
                extreme.value = if trend_up { high } else { low };
                extreme.kind = None;
            }
        }
        extreme
    }

    fn draw_line(results: &mut Vec<ZigZagResult>, quotes: &[Quote], last: &mut Pivot, next: Pivot) {
        if next.index != last.index {
            let increment = (next.value - last.value) / (next.index - last.index) as f64;
            for (i, quote) in quotes.iter().enumerate().take(next.index).skip(last.index) {
                let index = i + 1;
                // The first line has no defined start.
                let zig_zag = (last.index != 1 || index == next.index)
                    .then_some(last.value + increment * (index - last.index) as f64);
                results.push(ZigZagResult {
                    point_type: if index == next.index { next.kind } else { None },
                    zig_zag,
                    ..ZigZagResult::empty(quote.timestamp_ns)
                });
            }
        }
        *last = next;
    }

    fn draw_retrace(
        results: &mut [ZigZagResult],
        direction: Option<PointType>,
        last_high: &mut Pivot,
        last_low: &mut Pivot,
        next: Pivot,
    ) {
        let anchor = match direction {
            Some(PointType::Low) => last_high,
            Some(PointType::High) => last_low,
            None => return,
        };
        let prior = *anchor;
        anchor.index = next.index;
        anchor.value = next.value;

        if prior.index == 1 || prior.index == next.index {
            return;
        }

        let increment = (next.value - prior.value) / (next.index - prior.index) as f64;
        for (i, result) in results
            .iter_mut()
            .enumerate()
            .take(next.index)
            .skip(prior.index - 1)
        {
            let line = Some(prior.value + increment * (i + 1 - prior.index) as f64);
            match direction {
                Some(PointType::Low) => result.retrace_high = line,
                _ => result.retrace_low = line,
            }
        }
    }
}

impl Indicator<Quote> for ZigZag {
    type Output = ZigZagResult;

    fn compute(&self, quotes: &[Quote]) -> Vec<ZigZagResult> {
        let length = quotes.len();
        let mut results = Vec::with_capacity(length);
        let Some(first) = quotes.first() else {
            return results;
        };

        let threshold = self.percent_change / 100.0;
        let (mut last_point, mut last_high, mut last_low) = self.initial_point(quotes, threshold);
        results.push(ZigZagResult::empty(first.timestamp_ns));

        // A point that does not advance flips direction; two in a row means
        // the input has no usable swings left.
        let mut stalled = false;
        while last_point.index < length {
            let next = self.next_point(quotes, threshold, last_point);
            let direction = last_point.kind;
            let advanced = next.index != last_point.index;

            Self::draw_line(&mut results, quotes, &mut last_point, next);
            Self::draw_retrace(&mut results, direction, &mut last_high, &mut last_low, next);

            if advanced {
                stalled = false;
            } else if stalled {
                tracing::trace!(index = last_point.index, length, "zig zag stalled");
                break;
            } else {
                stalled = true;
            }
        }

        let filled = results.len();
        results.extend(
            quotes[filled..]
                .iter()
                .map(|q| ZigZagResult::empty(q.timestamp_ns)),
        );
        results
    }

    fn name(&self) -> &str {
        "ZIGZAG"
    }

    fn warmup_periods(&self) -> usize {
        1
    }
}

impl Algorithm<Quote> for ZigZag {
    type Output = ZigZagResult;

    fn name(&self) -> String {
        format!("ZIGZAG({},{})", self.end_type, self.percent_change)
    }

    fn min_cache_size(&self) -> usize {
        2
    }

    fn policy(&self) -> UpdatePolicy {
        UpdatePolicy::Repaint
    }

    fn transform(&mut self, frame: &Frame<'_, Quote, ZigZagResult>) -> ZigZagResult {
        self.compute(frame.history())
            .pop()
            .unwrap_or_else(|| ZigZagResult::empty(frame.item().timestamp_ns))
    }

    fn recompute(&mut self, source: &[Quote]) -> Vec<ZigZagResult> {
        self.compute(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_stream::{ChainProvider, QuoteHub};

    fn make_quotes(closes: &[f64]) -> Vec<Quote> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| Quote::new(i as i64, *c, *c, *c, *c, 0.0))
            .collect()
    }

    fn swings() -> Vec<Quote> {
        make_quotes(&[100.0, 105.0, 112.0, 120.0, 110.0, 100.0, 95.0, 105.0, 115.0])
    }

    #[test]
    fn test_zigzag_swing_points() {
        let zz = ZigZag::new(EndType::Close, 10.0).unwrap();
        let result = zz.compute(&swings());

        assert_eq!(result.len(), 9);
        assert!(result[..3].iter().all(|r| r.zig_zag.is_none()));

        assert_eq!(result[3].point_type, Some(PointType::High));
        assert!((result[3].zig_zag.unwrap() - 120.0).abs() < 1e-9);

        // Interpolated between the high at 120 and the low at 95
        assert!((result[4].zig_zag.unwrap() - (120.0 - 25.0 / 3.0)).abs() < 1e-9);

        assert_eq!(result[6].point_type, Some(PointType::Low));
        assert!((result[6].zig_zag.unwrap() - 95.0).abs() < 1e-9);

        // Last point is provisional
        assert!(result[8].point_type.is_none());
        assert!((result[8].zig_zag.unwrap() - 115.0).abs() < 1e-9);
    }

    #[test]
    fn test_zigzag_retrace_high() {
        let zz = ZigZag::new(EndType::Close, 10.0).unwrap();
        let result = zz.compute(&swings());

        // From the high at index 3 to the provisional high at index 8
        assert!(result[..3].iter().all(|r| r.retrace_high.is_none()));
        assert!((result[3].retrace_high.unwrap() - 120.0).abs() < 1e-9);
        assert!((result[8].retrace_high.unwrap() - 115.0).abs() < 1e-9);
        assert!(result.iter().all(|r| r.retrace_low.is_none()));
    }

    #[test]
    fn test_zigzag_flat_series_has_no_points() {
        let result = ZigZag::new(EndType::Close, 5.0)
            .unwrap()
            .compute(&make_quotes(&[10.0; 6]));

        assert_eq!(result.len(), 6);
        assert!(result.iter().all(|r| r.point_type.is_none()));
    }

    #[test]
    fn test_zigzag_rejects_bad_threshold() {
        assert!(ZigZag::new(EndType::Close, 0.0).is_err());
        assert!(ZigZag::new(EndType::HighLow, -1.0).is_err());
        assert!(matches!(
            ZigZag::new(EndType::HighLow, f64::NAN),
            Err(IndicatorError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_zigzag_hub_repaints_to_batch() {
        let quotes = swings();
        let zz = ZigZag::new(EndType::Close, 10.0).unwrap();

        let provider = QuoteHub::new();
        let hub = provider.subscribe(zz.clone());
        assert_eq!(hub.with_algorithm(|a| a.policy()), UpdatePolicy::Repaint);
        assert_eq!(hub.name(), "ZIGZAG(CLOSE,10)");

        for quote in &quotes {
            provider.add(*quote);
        }
        assert_eq!(&*hub.results(), zz.compute(&quotes).as_slice());

        // Revising the last close moves the provisional point.
        let revised = quotes[8].with_close(118.0);
        provider.insert(revised);
        let mut expected_quotes = quotes.clone();
        expected_quotes[8] = revised;
        assert_eq!(&*hub.results(), zz.compute(&expected_quotes).as_slice());
    }
}
