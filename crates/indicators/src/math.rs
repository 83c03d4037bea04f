//! Arithmetic shared by the batch, streaming and buffered paths.
//!
//! Each path must call the same helper in the same order for the results to
//! match bit for bit.

/// Sum of `values`; `None` if any value is missing.
pub(crate) fn sum_values(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    values.into_iter().sum()
}

/// Mean of `len` values; `None` if any value is missing.
pub(crate) fn mean_values(values: impl IntoIterator<Item = Option<f64>>, len: usize) -> Option<f64> {
    sum_values(values).map(|sum| sum / len as f64)
}

/// Population standard deviation around `mean`.
pub(crate) fn population_std(values: &[f64], mean: f64) -> f64 {
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Wilder smoothing step: `(prev * (n - 1) + value) / n`.
#[inline]
pub(crate) fn wilder(prev: f64, value: f64, period: usize) -> f64 {
    (prev * (period - 1) as f64 + value) / period as f64
}

/// Trailing `len` items ending at `index`, if that many exist.
pub(crate) fn trailing<T>(items: &[T], index: usize, len: usize) -> Option<&[T]> {
    if len == 0 || len > index + 1 {
        return None;
    }
    items.get(index + 1 - len..=index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_and_mean_propagate_missing() {
        assert_eq!(sum_values([Some(1.0), Some(2.0)]), Some(3.0));
        assert_eq!(sum_values([Some(1.0), None]), None);
        assert_eq!(mean_values([Some(1.0), Some(3.0)], 2), Some(2.0));
        assert!(mean_values([Some(f64::NAN), Some(1.0)], 2).is_some_and(f64::is_nan));
    }

    #[test]
    fn test_population_std() {
        let std = population_std(&[1.0, 2.0, 3.0], 2.0);
        assert!((std - (2.0_f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_wilder_step() {
        assert!((wilder(4.0, 10.0, 3) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_trailing_window() {
        let items = [1, 2, 3, 4];
        assert_eq!(trailing(&items, 3, 2), Some(&[3, 4][..]));
        assert_eq!(trailing(&items, 1, 2), Some(&[1, 2][..]));
        assert_eq!(trailing(&items, 0, 2), None);
        assert_eq!(trailing(&items, 3, 0), None);
    }
}
