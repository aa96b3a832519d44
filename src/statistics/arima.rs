//! ARIMA(1,1,1) forecaster.
//!
//! The differenced series `w_t = y_t - y_{t-1}` follows
//! `w_t = φ·w_{t-1} + e_t + θ·e_{t-1}` with no constant. Parameters come from a
//! Hannan-Rissanen regression refined by minimizing the conditional sum of
//! squares inside the stationary and invertible region.

use nalgebra::{DMatrix, DVector};

use super::regression::ols;
use crate::errors::ComputationError;
use crate::models::{Forecast, PriceSeries};

pub const DEFAULT_HORIZON: usize = 24;

const AR_ORDER: usize = 1;
const DIFF_ORDER: usize = 1;
const MA_ORDER: usize = 1;
const MIN_OBSERVATIONS: usize = AR_ORDER + DIFF_ORDER + MA_ORDER + 10;

const PARAM_BOUND: f64 = 0.999;
const MAX_ITERATIONS: usize = 1000;
const F_TOLERANCE: f64 = 1e-8;
const X_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct ArimaModel {
    pub phi: f64,
    pub theta: f64,
    pub sigma2: f64,
    pub aic: f64,
    pub iterations: usize,
    last_price: f64,
    last_diff: f64,
    last_residual: f64,
}

impl ArimaModel {
    pub fn fit(data: &[f64]) -> Result<Self, ComputationError> {
        if data.len() < MIN_OBSERVATIONS {
            return Err(ComputationError::InsufficientData {
                needed: MIN_OBSERVATIONS,
                available: data.len(),
            });
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(ComputationError::DegenerateSeries(
                "series contains non-finite values".to_string(),
            ));
        }

        let diff: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();
        let mean = diff.iter().sum::<f64>() / diff.len() as f64;
        let variance = diff.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / diff.len() as f64;
        if variance <= f64::EPSILON * mean.abs().max(1.0) {
            return Err(ComputationError::DegenerateSeries(
                "differenced series has no variance".to_string(),
            ));
        }

        let start = hannan_rissanen(&diff).unwrap_or([0.0, 0.0]);
        let start = [clamp(start[0]), clamp(start[1])];
        let (params, iterations) = nelder_mead(|p| css(&diff, p[0], p[1]), start)?;
        let [phi, theta] = params;

        let residuals = residuals(&diff, phi, theta);
        let n = residuals.len() as f64;
        let ssr: f64 = residuals.iter().map(|e| e * e).sum();
        let sigma2 = ssr / n;
        if !sigma2.is_finite() {
            return Err(ComputationError::NonConvergence(iterations));
        }
        let log_likelihood = -0.5 * n * (1.0 + (2.0 * std::f64::consts::PI * sigma2).ln());
        let aic = -2.0 * log_likelihood + 2.0 * 3.0;

        log::debug!(
            "ARIMA(1,1,1) fit: phi={:.4} theta={:.4} sigma2={:.6} after {} iterations",
            phi,
            theta,
            sigma2,
            iterations
        );

        Ok(Self {
            phi,
            theta,
            sigma2,
            aic,
            iterations,
            last_price: data[data.len() - 1],
            last_diff: diff[diff.len() - 1],
            last_residual: residuals[residuals.len() - 1],
        })
    }

    /// Point forecasts for the next `horizon` steps.
    pub fn forecast(&self, horizon: usize) -> Forecast {
        let mut values = Vec::with_capacity(horizon);
        let mut price = self.last_price;
        let mut diff = self.last_diff;

        for step in 0..horizon {
            diff = if step == 0 {
                self.phi * diff + self.theta * self.last_residual
            } else {
                self.phi * diff
            };
            price += diff;
            values.push(price);
        }

        Forecast { values }
    }
}

/// Forward-fills the closes, fits ARIMA(1,1,1) and projects `horizon` steps.
pub fn forecast(series: &PriceSeries, horizon: usize) -> Result<Forecast, ComputationError> {
    let closes = series.forward_filled();
    let model = ArimaModel::fit(&closes)?;
    Ok(model.forecast(horizon))
}

fn clamp(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(-0.9, 0.9)
    } else {
        0.0
    }
}

/// Conditional residuals with `e_0 = 0`.
fn residuals(diff: &[f64], phi: f64, theta: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(diff.len() - 1);
    let mut prev_e = 0.0;
    for t in 1..diff.len() {
        let e = diff[t] - phi * diff[t - 1] - theta * prev_e;
        out.push(e);
        prev_e = e;
    }
    out
}

fn css(diff: &[f64], phi: f64, theta: f64) -> f64 {
    if phi.abs() >= PARAM_BOUND || theta.abs() >= PARAM_BOUND {
        return f64::INFINITY;
    }
    residuals(diff, phi, theta).iter().map(|e| e * e).sum()
}

/// Two-step starting values: a long autoregression supplies residual
/// estimates, then `w_t` is regressed on `w_{t-1}` and `ê_{t-1}`.
fn hannan_rissanen(diff: &[f64]) -> Option<[f64; 2]> {
    let n = diff.len();
    let long_order = (n / 4).clamp(2, 10);
    if n < long_order + 5 {
        return None;
    }

    let rows = n - long_order;
    let mut x_data = Vec::with_capacity(rows * long_order);
    for t in long_order..n {
        for i in 1..=long_order {
            x_data.push(diff[t - i]);
        }
    }
    let long_fit = ols(
        &DMatrix::from_row_slice(rows, long_order, &x_data),
        &DVector::from_column_slice(&diff[long_order..]),
    )
    .ok()?;
    let innovations = long_fit.residuals;

    // innovations[j] belongs to diff[long_order + j]
    let rows = innovations.len() - 1;
    let mut x_data = Vec::with_capacity(rows * 2);
    for j in 1..innovations.len() {
        x_data.push(diff[long_order + j - 1]);
        x_data.push(innovations[j - 1]);
    }
    let fit = ols(
        &DMatrix::from_row_slice(rows, 2, &x_data),
        &DVector::from_column_slice(&diff[long_order + 1..]),
    )
    .ok()?;

    Some([fit.beta[0], fit.beta[1]])
}

/// Two-dimensional Nelder-Mead minimization. Returns the best vertex and the
/// number of iterations used.
fn nelder_mead<F>(f: F, start: [f64; 2]) -> Result<([f64; 2], usize), ComputationError>
where
    F: Fn(&[f64; 2]) -> f64,
{
    let step = 0.1;
    let mut simplex = [
        start,
        [start[0] + step, start[1]],
        [start[0], start[1] + step],
    ];
    let mut values = simplex.map(|p| f(&p));

    for iteration in 0..MAX_ITERATIONS {
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.map(|i| simplex[i]);
        values = order.map(|i| values[i]);

        if !values[0].is_finite() {
            return Err(ComputationError::NonConvergence(iteration));
        }

        let spread = (values[2] - values[0]).abs();
        let size = simplex[1..]
            .iter()
            .map(|p| (p[0] - simplex[0][0]).abs().max((p[1] - simplex[0][1]).abs()))
            .fold(0.0, f64::max);
        if spread <= F_TOLERANCE * (1.0 + values[0].abs()) && size <= X_TOLERANCE {
            return Ok((simplex[0], iteration));
        }

        let centroid = [
            (simplex[0][0] + simplex[1][0]) / 2.0,
            (simplex[0][1] + simplex[1][1]) / 2.0,
        ];
        let towards = |coef: f64| {
            [
                centroid[0] + coef * (simplex[2][0] - centroid[0]),
                centroid[1] + coef * (simplex[2][1] - centroid[1]),
            ]
        };

        let reflected = towards(-1.0);
        let f_reflected = f(&reflected);

        if f_reflected < values[0] {
            let expanded = towards(-2.0);
            let f_expanded = f(&expanded);
            if f_expanded < f_reflected {
                simplex[2] = expanded;
                values[2] = f_expanded;
            } else {
                simplex[2] = reflected;
                values[2] = f_reflected;
            }
        } else if f_reflected < values[1] {
            simplex[2] = reflected;
            values[2] = f_reflected;
        } else {
            let contracted = if f_reflected < values[2] {
                towards(-0.5)
            } else {
                towards(0.5)
            };
            let f_contracted = f(&contracted);
            if f_contracted < values[2].min(f_reflected) {
                simplex[2] = contracted;
                values[2] = f_contracted;
            } else {
                for i in 1..3 {
                    simplex[i] = [
                        simplex[0][0] + 0.5 * (simplex[i][0] - simplex[0][0]),
                        simplex[0][1] + 0.5 * (simplex[i][1] - simplex[0][1]),
                    ];
                    values[i] = f(&simplex[i]);
                }
            }
        }
    }

    Err(ComputationError::NonConvergence(MAX_ITERATIONS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn simulate(len: usize, phi: f64, theta: f64, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut price = 1000.0;
        let mut prev_w = 0.0;
        let mut prev_e = 0.0;
        let mut out = vec![price];
        for _ in 1..len {
            let e = noise.sample(&mut rng);
            let w = phi * prev_w + e + theta * prev_e;
            price += w;
            out.push(price);
            prev_w = w;
            prev_e = e;
        }
        out
    }

    #[test]
    fn test_forecast_has_requested_horizon() {
        for len in [MIN_OBSERVATIONS, 50, 168] {
            let data = simulate(len, 0.4, 0.2, len as u64);
            let model = ArimaModel::fit(&data).unwrap();
            assert_eq!(model.forecast(DEFAULT_HORIZON).horizon(), DEFAULT_HORIZON);
            assert_eq!(model.forecast(5).values.len(), 5);
        }
    }

    #[test]
    fn test_recovers_parameters() {
        let data = simulate(3000, 0.6, 0.3, 42);
        let model = ArimaModel::fit(&data).unwrap();
        assert!((model.phi - 0.6).abs() < 0.15, "phi {}", model.phi);
        assert!((model.theta - 0.3).abs() < 0.15, "theta {}", model.theta);
        assert_relative_eq!(model.sigma2, 1.0, epsilon = 0.15);
    }

    #[test]
    fn test_parameters_stay_in_admissible_region() {
        let data = simulate(168, 0.9, -0.5, 9);
        let model = ArimaModel::fit(&data).unwrap();
        assert!(model.phi.abs() < PARAM_BOUND);
        assert!(model.theta.abs() < PARAM_BOUND);
    }

    #[test]
    fn test_forecast_recursion() {
        let model = ArimaModel {
            phi: 0.5,
            theta: 0.2,
            sigma2: 1.0,
            aic: 0.0,
            iterations: 0,
            last_price: 100.0,
            last_diff: 2.0,
            last_residual: 1.0,
        };
        let values = model.forecast(3).values;
        // w1 = 0.5 * 2 + 0.2 * 1 = 1.2, w2 = 0.6, w3 = 0.3
        assert_relative_eq!(values[0], 101.2, epsilon = 1e-12);
        assert_relative_eq!(values[1], 101.8, epsilon = 1e-12);
        assert_relative_eq!(values[2], 102.1, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_closes_are_forward_filled() {
        let mut closes = simulate(60, 0.3, 0.1, 5);
        closes[10] = f64::NAN;
        closes[30] = f64::NAN;
        let series = PriceSeries {
            timestamps: Vec::new(),
            closes,
        };
        let result = forecast(&series, DEFAULT_HORIZON).unwrap();
        assert_eq!(result.horizon(), DEFAULT_HORIZON);
        assert!(result.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_short_series_is_rejected() {
        let err = ArimaModel::fit(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            ComputationError::InsufficientData { needed: 13, available: 3 }
        ));
    }

    #[test]
    fn test_constant_series_is_degenerate() {
        let err = ArimaModel::fit(&[50.0; 40]).unwrap_err();
        assert!(matches!(err, ComputationError::DegenerateSeries(_)));
    }

    #[test]
    fn test_nelder_mead_finds_quadratic_minimum() {
        let (p, _) = nelder_mead(|p| (p[0] - 0.3).powi(2) + (p[1] + 0.2).powi(2) + 1.0, [0.0, 0.0])
            .unwrap();
        assert_relative_eq!(p[0], 0.3, epsilon = 1e-4);
        assert_relative_eq!(p[1], -0.2, epsilon = 1e-4);
    }
}
