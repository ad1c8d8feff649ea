//! Sample covariance and the dense linear algebra behind the optimizer.
//!
//! Built on `nalgebra`. Near-singular covariance is detected here but never
//! regularized; the caller decides what to do with it.

use nalgebra::{Cholesky, DMatrix, DVector};

use crate::data::ReturnWindow;
use crate::errors::{PortfolioError, PortfolioResult};

/// Square symmetric sample covariance of a return window.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceMatrix {
    assets: Vec<String>,
    matrix: DMatrix<f64>,
}

impl CovarianceMatrix {
    /// Sample covariance (denominator `T - 1`) of every asset pair in `window`.
    ///
    /// # Errors
    /// `InsufficientData` with fewer than 2 rows.
    pub fn from_window(window: &ReturnWindow<'_>) -> PortfolioResult<Self> {
        let t = window.len();
        if t < 2 {
            return Err(PortfolioError::InsufficientData {
                required: 2,
                actual: t,
            });
        }

        let n = window.n_assets();
        let centered: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let col = window.column(i);
                let m = col.iter().sum::<f64>() / t as f64;
                col.iter().map(|x| x - m).collect()
            })
            .collect();

        let denom = (t - 1) as f64;
        let mut matrix = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            for j in i..n {
                let c = centered[i]
                    .iter()
                    .zip(&centered[j])
                    .map(|(a, b)| a * b)
                    .sum::<f64>()
                    / denom;
                matrix[(i, j)] = c;
                matrix[(j, i)] = c;
            }
        }

        Ok(Self {
            assets: window.assets().to_vec(),
            matrix,
        })
    }

    /// Wrap an explicit covariance matrix.
    ///
    /// # Errors
    /// `InvalidInput` if the matrix is not square with one row per asset,
    /// contains non-finite entries, or is not symmetric.
    pub fn from_matrix(assets: Vec<String>, matrix: DMatrix<f64>) -> PortfolioResult<Self> {
        let n = assets.len();
        if n == 0 {
            return Err(PortfolioError::EmptyInput {
                context: "covariance matrix".to_string(),
            });
        }
        if matrix.nrows() != n || matrix.ncols() != n {
            return Err(PortfolioError::invalid_input(format!(
                "covariance is {}x{} for {} assets",
                matrix.nrows(),
                matrix.ncols(),
                n
            )));
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(PortfolioError::invalid_input(
                "covariance contains non-finite values",
            ));
        }
        let scale = matrix.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1.0);
        for i in 0..n {
            for j in (i + 1)..n {
                if (matrix[(i, j)] - matrix[(j, i)]).abs() > 1e-10 * scale {
                    return Err(PortfolioError::invalid_input(format!(
                        "covariance not symmetric at ({}, {})",
                        i, j
                    )));
                }
            }
        }
        Ok(Self { assets, matrix })
    }

    /// Asset order of rows and columns
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Underlying matrix
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Dimension
    pub fn dim(&self) -> usize {
        self.assets.len()
    }

    /// Variance of asset `i`
    pub fn variance(&self, i: usize) -> f64 {
        self.matrix[(i, i)]
    }

    /// Largest diagonal entry
    pub fn max_variance(&self) -> f64 {
        self.matrix.diagonal().iter().fold(0.0f64, |m, v| m.max(*v))
    }

    /// `wᵀ Σ w`
    pub fn quadratic_form(&self, weights: &[f64]) -> f64 {
        let w = DVector::from_column_slice(weights);
        (w.transpose() * &self.matrix * &w)[(0, 0)]
    }

    /// `Σ w`
    pub fn gradient(&self, weights: &[f64]) -> DVector<f64> {
        &self.matrix * DVector::from_column_slice(weights)
    }

    /// Smallest and largest eigenvalues
    pub fn eigenvalue_range(&self) -> (f64, f64) {
        let eigen = self.matrix.clone().symmetric_eigen();
        eigen
            .eigenvalues
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Fail with `OptimizationFailed` when the smallest eigenvalue is at or
    /// below `tolerance` times the largest.
    pub fn ensure_nonsingular(&self, tolerance: f64) -> PortfolioResult<()> {
        let (lo, hi) = self.eigenvalue_range();
        if !(hi > 0.0) || lo <= tolerance * hi {
            return Err(PortfolioError::OptimizationFailed {
                reason: format!(
                    "covariance matrix is singular or near-singular (eigenvalues {:.3e}..{:.3e})",
                    lo, hi
                ),
                iterations: 0,
            });
        }
        Ok(())
    }

    /// Principal submatrix over `indices`
    pub fn submatrix(&self, indices: &[usize]) -> DMatrix<f64> {
        DMatrix::from_fn(indices.len(), indices.len(), |r, c| {
            self.matrix[(indices[r], indices[c])]
        })
    }
}

/// Cholesky factorization of a symmetric positive definite matrix.
///
/// Returns `None` when the matrix is not positive definite.
pub fn cholesky(matrix: DMatrix<f64>) -> Option<Cholesky<f64, nalgebra::Dyn>> {
    Cholesky::new(matrix)
}
