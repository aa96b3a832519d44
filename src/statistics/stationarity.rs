//! Augmented Dickey-Fuller unit-root test (constant, no trend).
//!
//! H0: the series has a unit root (non-stationary).
//! H1: the series is stationary.

use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, Normal};

use super::regression::ols;
use crate::errors::ComputationError;
use crate::models::{CriticalValues, PriceSeries, Stationarity, StationarityVerdict};

pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;
const MIN_OBSERVATIONS: usize = 10;

// MacKinnon (1994) approximate p-value surface, constant only, one variable.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

// MacKinnon (2010) critical value response surfaces, constant only, one variable.
const CRIT_1: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRIT_5: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CRIT_10: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

pub fn test_series(
    series: &PriceSeries,
    significance: f64,
) -> Result<StationarityVerdict, ComputationError> {
    adf_test(&series.dropna(), significance)
}

/// Runs the ADF test with AIC lag selection and classifies the p-value
/// against `significance`. Non-finite entries are dropped first.
pub fn adf_test(data: &[f64], significance: f64) -> Result<StationarityVerdict, ComputationError> {
    let data: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    let n = data.len();
    if n < MIN_OBSERVATIONS {
        return Err(ComputationError::InsufficientData {
            needed: MIN_OBSERVATIONS,
            available: n,
        });
    }

    let diff: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();
    if diff.iter().all(|d| *d == 0.0) {
        return Err(ComputationError::DegenerateSeries(
            "constant series has no variation to test".to_string(),
        ));
    }

    let max_lag = ((12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize).min(n / 2 - 2);

    // Every candidate lag is scored on the sample that the largest lag leaves.
    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lag {
        let (x, y) = design(&data, &diff, lag, max_lag);
        let aic = match ols(&x, &y) {
            Ok(fit) => fit.aic(),
            Err(_) => continue,
        };
        match best {
            Some((_, best_aic)) if best_aic <= aic => {}
            _ => best = Some((lag, aic)),
        }
    }
    let (used_lag, _) = best.ok_or(ComputationError::SingularMatrix)?;

    let (x, y) = design(&data, &diff, used_lag, used_lag);
    let nobs = y.len();
    let fit = ols(&x, &y)?;
    let statistic = fit.t_value(1)?;

    let p_value = mackinnon_p_value(statistic)?;
    let classification = if p_value < significance {
        Stationarity::Stationary
    } else {
        Stationarity::NonStationary
    };

    log::debug!(
        "ADF statistic {:.4}, p-value {:.6}, lag {}, nobs {}",
        statistic,
        p_value,
        used_lag,
        nobs
    );

    Ok(StationarityVerdict {
        classification,
        p_value,
        significance,
        statistic,
        used_lag,
        nobs,
        critical_values: critical_values(nobs),
    })
}

/// Regression of `Δy_t` on `[1, y_{t-1}, Δy_{t-1}, .., Δy_{t-lag}]`, with rows
/// starting after `skip` differences.
fn design(data: &[f64], diff: &[f64], lag: usize, skip: usize) -> (DMatrix<f64>, DVector<f64>) {
    let rows = diff.len() - skip;
    let cols = 2 + lag;
    let mut x_data = Vec::with_capacity(rows * cols);

    for t in skip..diff.len() {
        x_data.push(1.0);
        x_data.push(data[t]);
        for i in 1..=lag {
            x_data.push(diff[t - i]);
        }
    }

    (
        DMatrix::from_row_slice(rows, cols, &x_data),
        DVector::from_column_slice(&diff[skip..]),
    )
}

/// MacKinnon's approximate asymptotic p-value for the ADF statistic.
pub fn mackinnon_p_value(statistic: f64) -> Result<f64, ComputationError> {
    if statistic > TAU_MAX {
        return Ok(1.0);
    }
    if statistic < TAU_MIN {
        return Ok(0.0);
    }

    let poly = if statistic <= TAU_STAR {
        polyval(&TAU_SMALL_P, statistic)
    } else {
        polyval(&TAU_LARGE_P, statistic)
    };

    let normal =
        Normal::new(0.0, 1.0).map_err(|e| ComputationError::Distribution(e.to_string()))?;
    Ok(normal.cdf(poly))
}

pub fn critical_values(nobs: usize) -> CriticalValues {
    let n = nobs as f64;
    let surface = |c: &[f64; 4]| c[0] + c[1] / n + c[2] / n.powi(2) + c[3] / n.powi(3);
    CriticalValues {
        one_pct: surface(&CRIT_1),
        five_pct: surface(&CRIT_5),
        ten_pct: surface(&CRIT_10),
    }
}

// Coefficients in ascending order of power.
fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::{Distribution, Normal as NormalDist};

    fn oscillating(len: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = NormalDist::new(0.0, 1.0).unwrap();
        (0..len)
            .map(|i| {
                let side = if i % 2 == 0 { 1.0 } else { -1.0 };
                100.0 + side + noise.sample(&mut rng)
            })
            .collect()
    }

    fn increasing(len: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut price = 100.0;
        (0..len)
            .map(|_| {
                price *= 1.0 + 0.005 + rng.random_range(-0.002..0.002);
                price
            })
            .collect()
    }

    #[test]
    fn test_oscillating_series_is_stationary() {
        let verdict = adf_test(&oscillating(168, 7), DEFAULT_SIGNIFICANCE).unwrap();
        assert!(verdict.is_stationary(), "p-value {}", verdict.p_value);
        assert!(verdict.statistic < verdict.critical_values.five_pct);
    }

    #[test]
    fn test_increasing_series_is_not_stationary() {
        let data = increasing(168, 11);
        assert!(data.windows(2).all(|w| w[1] > w[0]));
        let verdict = adf_test(&data, DEFAULT_SIGNIFICANCE).unwrap();
        assert!(!verdict.is_stationary(), "p-value {}", verdict.p_value);
    }

    #[test]
    fn test_verdict_is_deterministic() {
        let data = oscillating(168, 3);
        let first = adf_test(&data, DEFAULT_SIGNIFICANCE).unwrap();
        let second = adf_test(&data, DEFAULT_SIGNIFICANCE).unwrap();
        assert_eq!(first.p_value, second.p_value);
        assert_eq!(first.used_lag, second.used_lag);
    }

    #[test]
    fn test_missing_values_are_dropped() {
        let mut data = oscillating(100, 5);
        let clean = adf_test(&data, DEFAULT_SIGNIFICANCE).unwrap();
        data.insert(10, f64::NAN);
        data.push(f64::NAN);
        let with_gaps = adf_test(&data, DEFAULT_SIGNIFICANCE).unwrap();
        assert_relative_eq!(clean.p_value, with_gaps.p_value);
    }

    #[test]
    fn test_short_series_is_an_error() {
        let err = adf_test(&[1.0, 2.0, 1.5], DEFAULT_SIGNIFICANCE).unwrap_err();
        assert!(matches!(
            err,
            ComputationError::InsufficientData { needed: 10, available: 3 }
        ));
    }

    #[test]
    fn test_constant_series_is_degenerate() {
        let err = adf_test(&[5.0; 50], DEFAULT_SIGNIFICANCE).unwrap_err();
        assert!(matches!(err, ComputationError::DegenerateSeries(_)));
    }

    #[test]
    fn test_mackinnon_p_value_tails() {
        assert_eq!(mackinnon_p_value(3.0).unwrap(), 1.0);
        assert_eq!(mackinnon_p_value(-25.0).unwrap(), 0.0);
        // the 5% asymptotic critical value sits near p = 0.05
        assert_relative_eq!(mackinnon_p_value(-2.86).unwrap(), 0.05, epsilon = 0.01);
        let mid = mackinnon_p_value(-1.0).unwrap();
        assert!(mid > 0.5 && mid < 1.0);
    }

    #[test]
    fn test_p_value_branches_meet_at_tau_star() {
        let small = polyval(&TAU_SMALL_P, TAU_STAR);
        let large = polyval(&TAU_LARGE_P, TAU_STAR);
        assert_relative_eq!(small, large, epsilon = 2e-3);

        let below = mackinnon_p_value(TAU_STAR - 1e-6).unwrap();
        let above = mackinnon_p_value(TAU_STAR + 1e-6).unwrap();
        assert_relative_eq!(below, above, epsilon = 1e-3);
    }

    #[test]
    fn test_large_p_reference_value() {
        assert_relative_eq!(mackinnon_p_value(-1.0).unwrap(), 0.7533, epsilon = 1e-3);
    }

    #[test]
    fn test_critical_values_order() {
        let cv = critical_values(150);
        assert!(cv.one_pct < cv.five_pct && cv.five_pct < cv.ten_pct);
        assert_relative_eq!(cv.five_pct, -2.8808, epsilon = 1e-3);
    }
}
