pub struct RollingStats;

impl RollingStats {
    /// Trailing mean over `window` points. The first `window - 1` entries and any
    /// window containing a non-finite value are `None`.
    pub fn mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
        Self::rolling(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
    }

    /// Trailing sample standard deviation (n - 1 denominator).
    pub fn std_dev(values: &[f64], window: usize) -> Vec<Option<f64>> {
        if window < 2 {
            return vec![None; values.len()];
        }
        Self::rolling(values, window, |w| {
            let n = w.len() as f64;
            let mean = w.iter().sum::<f64>() / n;
            (w.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        })
    }

    fn rolling<F>(values: &[f64], window: usize, reduce: F) -> Vec<Option<f64>>
    where
        F: Fn(&[f64]) -> f64,
    {
        let mut out = vec![None; values.len()];
        if window == 0 || values.len() < window {
            return out;
        }
        for (end, slice) in values.windows(window).enumerate() {
            if slice.iter().all(|v| v.is_finite()) {
                out[end + window - 1] = Some(reduce(slice));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rolling_mean_alignment() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let means = RollingStats::mean(&values, 3);
        assert!(means[..2].iter().all(Option::is_none));
        assert_relative_eq!(means[2].unwrap(), 2.0);
        assert_relative_eq!(means[4].unwrap(), 4.0);
    }

    #[test]
    fn test_rolling_std_is_sample_std() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stds = RollingStats::std_dev(&values, 8);
        // population std of this set is 2.0, sample std is sqrt(32 / 7)
        assert_relative_eq!(stds[7].unwrap(), (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_window_with_missing_value_is_undefined() {
        let values = vec![1.0, f64::NAN, 3.0, 4.0, 5.0];
        let means = RollingStats::mean(&values, 2);
        assert_eq!(means[1], None);
        assert_eq!(means[2], None);
        assert_relative_eq!(means[3].unwrap(), 3.5);
    }
}
