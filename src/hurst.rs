//! Hurst exponent estimation by rescaled-range (R/S) analysis.
//!
//! The series is partitioned into non-overlapping windows at several scales.
//! Each window yields a range-over-standard-deviation statistic; the slope of
//! `ln(mean R/S)` against `ln(window size)` estimates the Hurst exponent.
//!
//! ## Interpretation
//! - **H ≈ 0.5**: no long-range dependence (random walk)
//! - **H > 0.5**: persistent, trends tend to continue
//! - **H < 0.5**: anti-persistent, moves tend to reverse
//!
//! Estimation never fails hard. A series that cannot be analysed produces
//! [`HurstResult::Unavailable`] with the reason, so one bad asset cannot
//! abort a multi-asset run.
//!
//! ## Small-sample bias
//! Raw R/S slopes overstate H on short windows. The default
//! [`BiasCorrection::AnisLloyd`] regresses on the deviation of the observed
//! statistic from its expectation under independence (Anis and Lloyd 1976,
//! with the Peters `(n - 1/2)/n` factor) and adds back 0.5.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;

use statrs::function::gamma::ln_gamma;

use crate::config::{BiasCorrection, HurstConfig, RsMethod, WindowSchedule};
use crate::data::ReturnMatrix;
use crate::math_utils::{
    constants::MIN_VARIANCE, cumulative_sum, float_ops, geometric_window_sizes,
    log_spaced_window_sizes, ols_regression, population_std_dev,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Minimum number of usable window sizes for a regression
pub const MIN_SCALES: usize = 2;

/// Mean R/S statistic at one window size.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScalePoint {
    /// Window size
    pub window: usize,
    /// Mean R/S over the usable windows of this size
    pub mean_rs: f64,
    /// Number of windows that produced a statistic
    pub n_windows: usize,
}

/// A successful estimate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HurstEstimate {
    /// Estimated exponent, strictly inside (0, 1)
    pub hurst: f64,
    /// OLS standard error of the slope; `None` with exactly two scales
    pub standard_error: Option<f64>,
    /// Regression inputs
    pub scales: Vec<ScalePoint>,
    /// Length of the series actually analysed
    pub observations: usize,
}

/// Why an estimate could not be produced.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Unavailability {
    /// Fewer finite observations than the configured minimum
    TooShort {
        /// Configured minimum
        required: usize,
        /// Observations left after cleaning
        actual: usize,
    },
    /// The analysed series is constant
    ZeroVariance,
    /// Fewer usable window sizes than the regression needs
    InsufficientScales {
        /// Minimum scales
        required: usize,
        /// Scales that produced a statistic
        actual: usize,
    },
    /// The regression could not be computed or returned non-finite values
    DegenerateRegression(String),
    /// The estimate fell outside (0, 1)
    OutOfRange(f64),
}

impl fmt::Display for Unavailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailability::TooShort { required, actual } => {
                write!(f, "series too short: {} < {}", actual, required)
            }
            Unavailability::ZeroVariance => write!(f, "series has zero variance"),
            Unavailability::InsufficientScales { required, actual } => {
                write!(f, "only {} usable window sizes, need {}", actual, required)
            }
            Unavailability::DegenerateRegression(reason) => {
                write!(f, "degenerate regression: {}", reason)
            }
            Unavailability::OutOfRange(h) => write!(f, "estimate {:.4} outside (0, 1)", h),
        }
    }
}

/// Outcome of estimating one series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HurstResult {
    /// Estimate in (0, 1)
    Available(HurstEstimate),
    /// No estimate, with the reason
    Unavailable(Unavailability),
}

impl HurstResult {
    /// The exponent, if available
    pub fn value(&self) -> Option<f64> {
        match self {
            HurstResult::Available(est) => Some(est.hurst),
            HurstResult::Unavailable(_) => None,
        }
    }

    /// True for [`HurstResult::Available`]
    pub fn is_available(&self) -> bool {
        matches!(self, HurstResult::Available(_))
    }

    /// The reason, if unavailable
    pub fn unavailability(&self) -> Option<&Unavailability> {
        match self {
            HurstResult::Available(_) => None,
            HurstResult::Unavailable(reason) => Some(reason),
        }
    }
}

/// Per-asset estimation results in asset order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HurstReport {
    results: BTreeMap<String, HurstResult>,
}

impl HurstReport {
    /// Wrap per-asset results
    pub fn new(results: BTreeMap<String, HurstResult>) -> Self {
        Self { results }
    }

    /// Available exponents by asset
    pub fn available(&self) -> BTreeMap<String, f64> {
        self.results
            .iter()
            .filter_map(|(a, r)| r.value().map(|h| (a.clone(), h)))
            .collect()
    }

    /// Assets without an estimate and the reason for each
    pub fn unavailable(&self) -> Vec<(&str, &Unavailability)> {
        self.results
            .iter()
            .filter_map(|(a, r)| r.unavailability().map(|u| (a.as_str(), u)))
            .collect()
    }

    /// Fraction of assets with an estimate; 0 for an empty report
    pub fn coverage(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        let available = self.results.values().filter(|r| r.is_available()).count();
        available as f64 / self.results.len() as f64
    }

    /// Result for one asset
    pub fn get(&self, asset: &str) -> Option<&HurstResult> {
        self.results.get(asset)
    }

    /// Iterate `(asset, result)` in asset order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HurstResult)> + '_ {
        self.results.iter().map(|(a, r)| (a.as_str(), r))
    }

    /// Number of assets
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// True with no assets
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Rescaled-range Hurst estimator.
#[derive(Debug, Clone, Default)]
pub struct HurstEstimator {
    config: HurstConfig,
}

impl HurstEstimator {
    /// Estimator with the given configuration
    pub fn new(config: HurstConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &HurstConfig {
        &self.config
    }

    /// Estimate from a level series (prices or cumulative returns).
    ///
    /// Non-finite values are dropped before the length check.
    pub fn estimate(&self, levels: &[f64]) -> HurstResult {
        let levels: Vec<f64> = levels.iter().copied().filter(|v| v.is_finite()).collect();
        if levels.len() < self.config.min_length {
            return HurstResult::Unavailable(Unavailability::TooShort {
                required: self.config.min_length,
                actual: levels.len(),
            });
        }
        self.estimate_levels(levels)
    }

    /// Estimate from a return series.
    ///
    /// Returns are cumulated into levels starting at 0, so the increments
    /// of the level series are exactly the input returns.
    pub fn estimate_returns(&self, returns: &[f64]) -> HurstResult {
        let returns: Vec<f64> = returns.iter().copied().filter(|v| v.is_finite()).collect();
        if returns.len() < self.config.min_length {
            return HurstResult::Unavailable(Unavailability::TooShort {
                required: self.config.min_length,
                actual: returns.len(),
            });
        }
        let mut levels = Vec::with_capacity(returns.len() + 1);
        levels.push(0.0);
        levels.extend(cumulative_sum(&returns));
        self.estimate_levels(levels)
    }

    /// Estimate every column of `matrix` from its returns.
    ///
    /// Assets are processed in parallel with the `parallel` feature.
    /// Unavailable estimates are logged at warn level.
    pub fn estimate_assets(&self, matrix: &ReturnMatrix) -> HurstReport {
        #[cfg(feature = "parallel")]
        let results: Vec<(String, HurstResult)> = {
            use rayon::prelude::*;

            (0..matrix.n_assets())
                .into_par_iter()
                .map(|i| {
                    (
                        matrix.assets()[i].clone(),
                        self.estimate_returns(matrix.column(i)),
                    )
                })
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let results: Vec<(String, HurstResult)> = (0..matrix.n_assets())
            .map(|i| {
                (
                    matrix.assets()[i].clone(),
                    self.estimate_returns(matrix.column(i)),
                )
            })
            .collect();

        for (asset, result) in &results {
            if let HurstResult::Unavailable(reason) = result {
                log::warn!("Hurst exponent unavailable for {}: {}", asset, reason);
            }
        }

        HurstReport::new(results.into_iter().collect())
    }

    fn estimate_levels(&self, levels: Vec<f64>) -> HurstResult {
        // The series the windows are cut from: increments for Classical,
        // levels otherwise.
        let working: Vec<f64> = match self.config.method {
            RsMethod::Classical => levels.windows(2).map(|w| w[1] - w[0]).collect(),
            RsMethod::RandomWalk => levels,
            RsMethod::Price => {
                let positive: Vec<f64> = levels.into_iter().filter(|v| *v > 0.0).collect();
                if positive.len() < self.config.min_length {
                    return HurstResult::Unavailable(Unavailability::TooShort {
                        required: self.config.min_length,
                        actual: positive.len(),
                    });
                }
                positive
            }
        };

        if population_std_dev(&working) <= MIN_VARIANCE.sqrt() {
            return HurstResult::Unavailable(Unavailability::ZeroVariance);
        }

        let n = working.len();
        let scales: Vec<ScalePoint> = self
            .window_sizes(n)
            .into_iter()
            .filter_map(|size| {
                let stats = rs_statistics(&working, size, self.config.method);
                if stats.is_empty() {
                    return None;
                }
                let mean_rs = stats.iter().sum::<f64>() / stats.len() as f64;
                float_ops::safe_ln(mean_rs).map(|_| ScalePoint {
                    window: size,
                    mean_rs,
                    n_windows: stats.len(),
                })
            })
            .collect();

        if scales.len() < MIN_SCALES {
            return HurstResult::Unavailable(Unavailability::InsufficientScales {
                required: MIN_SCALES,
                actual: scales.len(),
            });
        }

        let anis_lloyd = self.config.bias_correction == BiasCorrection::AnisLloyd
            && self.config.method == RsMethod::Classical;

        let log_n: Vec<f64> = scales.iter().map(|s| (s.window as f64).ln()).collect();
        let log_rs: Vec<f64> = scales
            .iter()
            .map(|s| {
                let observed = s.mean_rs.ln();
                if anis_lloyd {
                    observed - expected_rs(s.window).ln()
                } else {
                    observed
                }
            })
            .collect();

        let fit = match ols_regression(&log_n, &log_rs) {
            Ok(fit) => fit,
            Err(e) => {
                return HurstResult::Unavailable(Unavailability::DegenerateRegression(
                    e.to_string(),
                ))
            }
        };

        let hurst = if anis_lloyd {
            0.5 + fit.slope
        } else if self.config.bias_correction == BiasCorrection::LogLength {
            fit.slope - 0.5 / (n as f64).ln()
        } else {
            fit.slope
        };

        if !hurst.is_finite() {
            return HurstResult::Unavailable(Unavailability::DegenerateRegression(
                "non-finite slope".to_string(),
            ));
        }
        if hurst <= 0.0 || hurst >= 1.0 {
            return HurstResult::Unavailable(Unavailability::OutOfRange(hurst));
        }

        HurstResult::Available(HurstEstimate {
            hurst,
            standard_error: fit.slope_std_error,
            scales,
            observations: n,
        })
    }

    /// Window sizes for a working series of length `n`.
    fn window_sizes(&self, n: usize) -> Vec<usize> {
        let min_size = self.config.min_window.max(2);
        let max_size = self.config.max_window.unwrap_or(n / 4).min(n);
        match &self.config.schedule {
            WindowSchedule::Geometric { growth } => {
                geometric_window_sizes(min_size, max_size, *growth)
            }
            WindowSchedule::LogSpaced { step_log10 } => {
                log_spaced_window_sizes(min_size, max_size, *step_log10)
            }
            WindowSchedule::Explicit(sizes) => {
                let mut sizes: Vec<usize> = sizes
                    .iter()
                    .copied()
                    .filter(|&s| s >= min_size && s <= max_size)
                    .collect();
                sizes.sort_unstable();
                sizes.dedup();
                sizes
            }
        }
    }
}

/// R/S statistics of the non-overlapping windows of `size` in `data`.
///
/// Windows with zero spread or zero range are skipped.
fn rs_statistics(data: &[f64], size: usize, method: RsMethod) -> Vec<f64> {
    data.chunks_exact(size)
        .filter_map(|window| {
            let (range, spread) = match method {
                RsMethod::Classical => classical_range_spread(window),
                RsMethod::RandomWalk => {
                    let increments: Vec<f64> = window.windows(2).map(|w| w[1] - w[0]).collect();
                    (value_range(window), population_std_dev(&increments))
                }
                RsMethod::Price => {
                    let changes: Vec<f64> = window.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
                    let (lo, hi) = min_max(window);
                    (hi / lo - 1.0, population_std_dev(&changes))
                }
            };
            if spread <= MIN_VARIANCE.sqrt() || !(range > 0.0) {
                return None;
            }
            let rs = range / spread;
            rs.is_finite().then_some(rs)
        })
        .collect()
}

/// Range of the cumulative mean-adjusted sums and the population std.
fn classical_range_spread(window: &[f64]) -> (f64, f64) {
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    let mut cumsum = 0.0;
    let (mut lo, mut hi) = (0.0f64, 0.0f64);
    for &x in window {
        cumsum += x - mean;
        lo = lo.min(cumsum);
        hi = hi.max(cumsum);
    }
    (hi - lo, population_std_dev(window))
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

fn value_range(values: &[f64]) -> f64 {
    let (lo, hi) = min_max(values);
    hi - lo
}

/// Expected R/S of `n` independent Gaussian increments (Anis-Lloyd-Peters).
pub fn expected_rs(n: usize) -> f64 {
    if n < 2 {
        return f64::NAN;
    }
    let nf = n as f64;
    let peters = (nf - 0.5) / nf;
    let gamma_ratio = (ln_gamma((nf - 1.0) / 2.0) - ln_gamma(nf / 2.0)).exp() / PI.sqrt();
    let sum: f64 = (1..n).map(|i| ((nf - i as f64) / i as f64).sqrt()).sum();
    peters * gamma_ratio * sum
}
