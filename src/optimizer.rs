//! Long-only minimum-variance allocation.
//!
//! Minimizes `wᵀΣw` subject to `Σw = 1` and `lower ≤ w_i ≤ upper` with a
//! primal active-set method started from the uniform allocation.
//!
//! ## Algorithm
//!
//! The working set holds the bounds currently treated as equalities. Each
//! iteration solves the equality-constrained Newton step on the free
//! coordinates,
//!
//! ```text
//! Σ_FF p + g_F = ν·1,   1ᵀp = 0,   g = Σw
//! ```
//!
//! through two Cholesky solves, `a = Σ_FF⁻¹ g_F` and `b = Σ_FF⁻¹ 1`, giving
//! `ν = 1ᵀa / 1ᵀb` and `p = ν·b - a`. A non-zero step is shortened to the
//! first bound it would cross and that bound joins the working set. A zero
//! step is optimal on the working set; the bound with the most negative
//! multiplier is released, or the point is optimal if every multiplier is
//! non-negative.
//!
//! The objective never increases, so the result is never worse than the
//! uniform start.

use std::time::{Duration, Instant};

use nalgebra::DVector;

use crate::allocation::{AllocationSource, AllocationWeights};
use crate::config::OptimizerConfig;
use crate::data::ReturnWindow;
use crate::errors::{PortfolioError, PortfolioResult};
use crate::linear_algebra::{cholesky, CovarianceMatrix};

/// Largest step component treated as zero
const STEP_TOLERANCE: f64 = 1e-10;

/// Converged minimum-variance allocation with solver diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct MinVarianceSolution {
    /// Optimal weights
    pub weights: AllocationWeights,
    /// Portfolio variance `wᵀΣw` at the optimum
    pub variance: f64,
    /// Active-set iterations over all attempts
    pub iterations: usize,
    /// True if the perturbed retry produced the solution
    pub retried: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoundState {
    Free,
    AtLower,
    AtUpper,
}

/// Why a single attempt stopped without converging.
#[derive(Debug)]
enum AttemptFailure {
    IterationCap(usize),
    TimeLimit(usize),
    Fatal(PortfolioError),
}

/// Constrained minimum-variance optimizer.
///
/// Holds configuration only; solver state is built fresh on every call, so
/// one optimizer can serve concurrent rolling windows.
#[derive(Debug, Clone, Default)]
pub struct VarianceOptimizer {
    config: OptimizerConfig,
}

impl VarianceOptimizer {
    /// Optimizer with the given configuration
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Minimum-variance weights for the assets of `window`.
    ///
    /// # Errors
    /// - `InsufficientData` with fewer than 2 rows
    /// - `InvalidParameter` for infeasible bounds
    /// - `OptimizationFailed` for singular covariance or non-convergence
    pub fn minimize_variance(
        &self,
        window: &ReturnWindow<'_>,
    ) -> PortfolioResult<AllocationWeights> {
        let covariance = CovarianceMatrix::from_window(window)?;
        self.solve(&covariance).map(|solution| solution.weights)
    }

    /// Solve against an explicit covariance matrix.
    pub fn solve(&self, covariance: &CovarianceMatrix) -> PortfolioResult<MinVarianceSolution> {
        self.config.validate()?;
        let n = covariance.dim();
        let (lower, upper) = (self.config.lower_bound, self.config.upper_bound);

        if n as f64 * lower > 1.0 + 1e-12 {
            return Err(PortfolioError::InvalidParameter {
                parameter: "lower_bound".to_string(),
                value: lower,
                constraint: format!("<= 1/{} for a feasible allocation", n),
            });
        }
        if (n as f64) * upper < 1.0 - 1e-12 {
            return Err(PortfolioError::InvalidParameter {
                parameter: "upper_bound".to_string(),
                value: upper,
                constraint: format!(">= 1/{} for a feasible allocation", n),
            });
        }
        if covariance.matrix().iter().any(|v| !v.is_finite()) {
            return Err(PortfolioError::OptimizationFailed {
                reason: "covariance contains non-finite values".to_string(),
                iterations: 0,
            });
        }
        covariance.ensure_nonsingular(self.config.singularity_tolerance)?;

        let started = Instant::now();
        let uniform = vec![1.0 / n as f64; n];

        let (weights, iterations, retried) =
            match self.attempt(covariance, uniform, started, self.config.time_limit) {
                Ok((w, iters)) => (w, iters, false),
                Err(AttemptFailure::Fatal(e)) => return Err(e),
                Err(AttemptFailure::TimeLimit(iters)) => {
                    return Err(PortfolioError::OptimizationFailed {
                        reason: "time limit exceeded".to_string(),
                        iterations: iters,
                    })
                }
                Err(AttemptFailure::IterationCap(iters)) => {
                    if !self.config.retry_with_perturbation {
                        return Err(PortfolioError::OptimizationFailed {
                            reason: format!(
                                "iteration cap of {} reached",
                                self.config.max_iterations
                            ),
                            iterations: iters,
                        });
                    }
                    log::warn!(
                        "Minimum-variance solver hit {} iterations, retrying from perturbed start",
                        iters
                    );
                    let start = self.perturbed_start(n);
                    match self.attempt(covariance, start, started, self.config.time_limit) {
                        Ok((w, more)) => (w, iters + more, true),
                        Err(AttemptFailure::Fatal(e)) => return Err(e),
                        Err(AttemptFailure::TimeLimit(more)) => {
                            return Err(PortfolioError::OptimizationFailed {
                                reason: "time limit exceeded on retry".to_string(),
                                iterations: iters + more,
                            })
                        }
                        Err(AttemptFailure::IterationCap(more)) => {
                            return Err(PortfolioError::OptimizationFailed {
                                reason: format!(
                                    "iteration cap of {} reached on retry",
                                    self.config.max_iterations
                                ),
                                iterations: iters + more,
                            })
                        }
                    }
                }
            };

        let weights = self.finalize(weights);
        let variance = covariance.quadratic_form(&weights);
        log::debug!(
            "Minimum-variance solve converged in {} iterations (variance {:.6e})",
            iterations,
            variance
        );

        let map = covariance
            .assets()
            .iter()
            .cloned()
            .zip(weights)
            .collect();
        Ok(MinVarianceSolution {
            weights: AllocationWeights::new(map, AllocationSource::MinimumVariance)?,
            variance,
            iterations,
            retried,
        })
    }

    /// One active-set run from a feasible `start`.
    fn attempt(
        &self,
        covariance: &CovarianceMatrix,
        start: Vec<f64>,
        started: Instant,
        time_limit: Option<Duration>,
    ) -> Result<(Vec<f64>, usize), AttemptFailure> {
        let n = covariance.dim();
        let (lower, upper) = (self.config.lower_bound, self.config.upper_bound);
        let multiplier_tolerance =
            self.config.tolerance * covariance.max_variance().max(f64::MIN_POSITIVE);

        let mut w = start;
        let mut state = vec![BoundState::Free; n];

        for iteration in 1..=self.config.max_iterations {
            if time_limit.map_or(false, |limit| started.elapsed() >= limit) {
                return Err(AttemptFailure::TimeLimit(iteration - 1));
            }

            let free: Vec<usize> = (0..n).filter(|&i| state[i] == BoundState::Free).collect();
            let g = covariance.gradient(&w);
            let (step, nu) = newton_step(covariance, &g, &free).map_err(AttemptFailure::Fatal)?;

            let max_step = step.iter().fold(0.0f64, |m, p| m.max(p.abs()));
            if max_step <= STEP_TOLERANCE {
                // Stationary on the working set; check bound multipliers.
                let release = (0..n)
                    .filter_map(|i| match state[i] {
                        BoundState::Free => None,
                        BoundState::AtLower => Some((i, g[i] - nu)),
                        BoundState::AtUpper => Some((i, nu - g[i])),
                    })
                    .filter(|(_, mu)| *mu < -multiplier_tolerance)
                    .min_by(|a, b| a.1.total_cmp(&b.1));

                match release {
                    Some((i, _)) => state[i] = BoundState::Free,
                    None => return Ok((w, iteration)),
                }
                continue;
            }

            // Longest feasible step along the direction, capped at the full step.
            let mut alpha = 1.0;
            let mut blocking: Option<(usize, BoundState)> = None;
            for (k, &i) in free.iter().enumerate() {
                let p = step[k];
                let (limit, bound) = if p < -STEP_TOLERANCE {
                    ((lower - w[i]) / p, BoundState::AtLower)
                } else if p > STEP_TOLERANCE {
                    ((upper - w[i]) / p, BoundState::AtUpper)
                } else {
                    continue;
                };
                let limit = limit.max(0.0);
                if limit < alpha {
                    alpha = limit;
                    blocking = Some((i, bound));
                }
            }

            for (k, &i) in free.iter().enumerate() {
                w[i] += alpha * step[k];
            }
            if let Some((i, bound)) = blocking {
                w[i] = if bound == BoundState::AtLower { lower } else { upper };
                state[i] = bound;
            }
        }

        Err(AttemptFailure::IterationCap(self.config.max_iterations))
    }

    /// Deterministic feasible start near uniform, or uniform if the bounds
    /// leave no room.
    fn perturbed_start(&self, n: usize) -> Vec<f64> {
        let uniform = 1.0 / n as f64;
        if n < 2 {
            return vec![uniform; n];
        }
        let half = (n - 1) as f64 / 2.0;
        let start: Vec<f64> = (0..n)
            .map(|i| uniform * (1.0 + self.config.perturbation * (i as f64 - half) / half))
            .collect();
        let feasible = start
            .iter()
            .all(|&v| v >= self.config.lower_bound && v <= self.config.upper_bound);
        if feasible {
            start
        } else {
            vec![uniform; n]
        }
    }

    /// Clamp rounding noise back into the box and restore the unit sum.
    fn finalize(&self, mut w: Vec<f64>) -> Vec<f64> {
        for v in w.iter_mut() {
            *v = v.clamp(self.config.lower_bound, self.config.upper_bound);
        }
        let total: f64 = w.iter().sum();
        if total > 0.0 {
            for v in w.iter_mut() {
                *v /= total;
            }
        }
        w
    }
}

/// Equality-constrained Newton step on the free coordinates.
///
/// Returns the step for each free index (in `free` order) and the budget
/// multiplier `ν`.
fn newton_step(
    covariance: &CovarianceMatrix,
    g: &DVector<f64>,
    free: &[usize],
) -> PortfolioResult<(Vec<f64>, f64)> {
    if free.is_empty() {
        return Ok((Vec::new(), 0.0));
    }

    let sub = covariance.submatrix(free);
    let chol = cholesky(sub).ok_or_else(|| PortfolioError::OptimizationFailed {
        reason: "free-set covariance is not positive definite".to_string(),
        iterations: 0,
    })?;

    let g_free = DVector::from_iterator(free.len(), free.iter().map(|&i| g[i]));
    let ones = DVector::from_element(free.len(), 1.0);
    let a = chol.solve(&g_free);
    let b = chol.solve(&ones);

    let denom = b.sum();
    if !(denom > 0.0) || !denom.is_finite() {
        return Err(PortfolioError::OptimizationFailed {
            reason: "degenerate budget constraint in Newton step".to_string(),
            iterations: 0,
        });
    }
    let nu = a.sum() / denom;
    let step: Vec<f64> = (0..free.len()).map(|k| nu * b[k] - a[k]).collect();
    if step.iter().any(|p| !p.is_finite()) {
        return Err(PortfolioError::OptimizationFailed {
            reason: "non-finite Newton step".to_string(),
            iterations: 0,
        });
    }
    Ok((step, nu))
}
