use nalgebra::{DMatrix, DVector};

use crate::errors::ComputationError;

/// Ordinary least squares fit via the normal equations.
pub(crate) struct OlsFit {
    pub beta: DVector<f64>,
    pub residuals: DVector<f64>,
    xtx_inv: DMatrix<f64>,
    pub ssr: f64,
    pub nobs: usize,
}

impl OlsFit {
    pub fn aic(&self) -> f64 {
        let n = self.nobs as f64;
        let k = self.beta.len() as f64;
        let llf = -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0);
        -2.0 * llf + 2.0 * k
    }

    pub fn t_value(&self, idx: usize) -> Result<f64, ComputationError> {
        let dof = self.nobs - self.beta.len();
        let sigma2 = self.ssr / dof as f64;
        let se = (sigma2 * self.xtx_inv[(idx, idx)]).sqrt();
        let t = self.beta[idx] / se;
        if t.is_finite() {
            Ok(t)
        } else {
            Err(ComputationError::DegenerateSeries(
                "regression residuals vanish".to_string(),
            ))
        }
    }
}

pub(crate) fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<OlsFit, ComputationError> {
    let nobs = x.nrows();
    if nobs <= x.ncols() {
        return Err(ComputationError::InsufficientData {
            needed: x.ncols() + 1,
            available: nobs,
        });
    }

    let xtx = x.transpose() * x;
    let xty = x.transpose() * y;
    let xtx_inv = xtx.try_inverse().ok_or(ComputationError::SingularMatrix)?;
    let beta = &xtx_inv * xty;

    let residuals = y - x * &beta;
    let ssr = residuals.norm_squared();
    if !(ssr > 0.0 && ssr.is_finite()) {
        return Err(ComputationError::DegenerateSeries(
            "regression fits exactly".to_string(),
        ));
    }

    Ok(OlsFit {
        beta,
        residuals,
        xtx_inv,
        ssr,
        nobs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_recovers_line_coefficients() {
        let xs: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let mut x_data = Vec::new();
        for &v in &xs {
            x_data.push(1.0);
            x_data.push(v);
        }
        let x = DMatrix::from_row_slice(20, 2, &x_data);
        // small alternating wobble keeps the fit from being exact
        let y = DVector::from_iterator(
            20,
            xs.iter()
                .enumerate()
                .map(|(i, v)| 3.0 + 2.0 * v + if i % 2 == 0 { 0.01 } else { -0.01 }),
        );

        let fit = ols(&x, &y).unwrap();
        assert_relative_eq!(fit.beta[0], 3.0, epsilon = 0.02);
        assert_relative_eq!(fit.beta[1], 2.0, epsilon = 0.01);
        assert!(fit.t_value(1).unwrap() > 100.0);
    }

    #[test]
    fn test_collinear_columns_are_singular() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(ols(&x, &y), Err(ComputationError::SingularMatrix)));
    }
}
