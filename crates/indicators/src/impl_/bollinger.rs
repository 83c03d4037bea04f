//! Bollinger Bands indicator

use std::collections::VecDeque;

use strata_stream::{Algorithm, BufferAlgorithm, Frame};
use strata_types::{Reusable, Series};

use crate::error::IndicatorError;
use crate::math::{population_std, trailing};
use crate::traits::{Buffered, Indicator};

/// Bollinger Bands output for one position.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BollingerResult {
    /// Timestamp of the source item
    pub timestamp_ns: i64,
    /// Middle band = SMA
    pub sma: Option<f64>,
    /// Upper band = SMA + std_factor * std
    pub upper_band: Option<f64>,
    /// Lower band = SMA - std_factor * std
    pub lower_band: Option<f64>,
    /// Position of the value within the bands; `None` when they coincide
    pub percent_b: Option<f64>,
    /// Standard score of the value; `None` when std is 0
    pub z_score: Option<f64>,
    /// Band width relative to the SMA; `None` when the SMA is 0
    pub width: Option<f64>,
}

impl BollingerResult {
    fn empty(timestamp_ns: i64) -> Self {
        Self {
            timestamp_ns,
            sma: None,
            upper_band: None,
            lower_band: None,
            percent_b: None,
            z_score: None,
            width: None,
        }
    }
}

impl Series for BollingerResult {
    fn timestamp_ns(&self) -> i64 {
        self.timestamp_ns
    }
}

impl Reusable for BollingerResult {
    fn value(&self) -> Option<f64> {
        self.percent_b
    }
}

/// Bollinger Bands
///
/// Calculates three bands based on standard deviation around a simple moving average:
/// - Upper Band = SMA + (std_factor * StdDev)
/// - Middle Band = SMA
/// - Lower Band = SMA - (std_factor * StdDev)
///
/// Uses population standard deviation (n), not sample (n-1).
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    std_factor: f64,
}

impl BollingerBands {
    /// Creates new Bollinger Bands with the given parameters.
    ///
    /// # Errors
    /// Returns `ParamOutOfRange` if `period < 2` or `std_factor` is not
    /// positive, and `InvalidParams` if `std_factor` is not finite.
    pub fn new(period: usize, std_factor: f64) -> Result<Self, IndicatorError> {
        let period = IndicatorError::require_at_least("period", period, 2)?;
        if !std_factor.is_finite() {
            return Err(IndicatorError::invalid_params(format!(
                "std_factor must be finite, got {std_factor}"
            )));
        }
        if std_factor <= 0.0 {
            return Err(IndicatorError::param_out_of_range(
                "std_factor",
                std_factor,
                f64::MIN_POSITIVE,
                f64::MAX,
            ));
        }
        Ok(Self { period, std_factor })
    }

    /// Creates Bollinger Bands from x100 encoded std_factor.
    ///
    /// # Errors
    /// Same as [`BollingerBands::new`].
    pub fn from_x100(period: usize, std_factor_x100: u32) -> Result<Self, IndicatorError> {
        Self::new(period, f64::from(std_factor_x100) / 100.0)
    }

    /// Period for the SMA and standard deviation
    #[must_use]
    pub fn period(&self) -> usize {
        self.period
    }

    /// Multiplier for standard deviation
    #[must_use]
    pub fn std_factor(&self) -> f64 {
        self.std_factor
    }

    /// Bands over a complete window; the newest value is the last one.
    fn bands(&self, timestamp_ns: i64, window: Option<Vec<f64>>) -> BollingerResult {
        let Some(values) = window else {
            return BollingerResult::empty(timestamp_ns);
        };
        let Some(&value) = values.last() else {
            return BollingerResult::empty(timestamp_ns);
        };

        let sma = values.iter().sum::<f64>() / self.period as f64;
        let std = population_std(&values, sma);
        let upper = sma + self.std_factor * std;
        let lower = sma - self.std_factor * std;

        BollingerResult {
            timestamp_ns,
            sma: Some(sma),
            upper_band: Some(upper),
            lower_band: Some(lower),
            percent_b: (upper != lower).then_some((value - lower) / (upper - lower)),
            z_score: (std != 0.0).then_some((value - sma) / std),
            width: (sma != 0.0).then_some((upper - lower) / sma),
        }
    }

    fn collect<I: Reusable>(window: Option<&[I]>) -> Option<Vec<f64>> {
        window?.iter().map(Reusable::value).collect()
    }
}

impl<I: Reusable> Indicator<I> for BollingerBands {
    type Output = BollingerResult;

    fn compute(&self, items: &[I]) -> Vec<BollingerResult> {
        (0..items.len())
            .map(|i| {
                let window = Self::collect(trailing(items, i, self.period));
                self.bands(items[i].timestamp_ns(), window)
            })
            .collect()
    }

    fn name(&self) -> &str {
        "BOLLINGER"
    }

    fn warmup_periods(&self) -> usize {
        self.period - 1
    }
}

impl<I: Reusable> Algorithm<I> for BollingerBands {
    type Output = BollingerResult;

    fn name(&self) -> String {
        format!("BB({},{})", self.period, self.std_factor)
    }

    fn min_cache_size(&self) -> usize {
        self.period
    }

    fn transform(&mut self, frame: &Frame<'_, I, BollingerResult>) -> BollingerResult {
        let window = Self::collect(frame.window(self.period));
        self.bands(frame.item().timestamp_ns(), window)
    }
}

/// Incremental Bollinger Bands over a bounded list.
#[derive(Debug, Clone)]
pub struct BollingerBuffer {
    bands: BollingerBands,
    window: VecDeque<Option<f64>>,
}

impl<I: Reusable> BufferAlgorithm<I> for BollingerBuffer {
    type Output = BollingerResult;

    fn name(&self) -> String {
        format!("BB({},{})", self.bands.period, self.bands.std_factor)
    }

    fn push(&mut self, item: &I, results: &mut Vec<BollingerResult>) {
        let period = self.bands.period;
        if self.window.len() == period {
            self.window.pop_front();
        }
        self.window.push_back(item.value());

        let values = (self.window.len() == period)
            .then(|| self.window.iter().copied().collect::<Option<Vec<f64>>>())
            .flatten();
        results.push(self.bands.bands(item.timestamp_ns(), values));
    }

    fn clear(&mut self) {
        self.window.clear();
    }
}

impl<I: Reusable> Buffered<I> for BollingerBands {
    type Buffer = BollingerBuffer;

    fn buffer(&self) -> BollingerBuffer {
        BollingerBuffer {
            bands: self.clone(),
            window: VecDeque::with_capacity(self.period),
        }
    }
}
