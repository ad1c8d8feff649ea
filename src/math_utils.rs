//! Mathematical utility functions and constants for portfolio analysis.
//!
//! Summary statistics, the regression used by rescaled-range analysis, scale
//! generation for the window schedules, and robust floating-point helpers.

use crate::errors::{PortfolioError, PortfolioResult};

/// Numerical constants shared across modules.
pub mod constants {
    /// Variance below this value is treated as zero
    pub const MIN_VARIANCE: f64 = 1e-20;

    /// Smallest argument accepted by [`super::float_ops::safe_ln`]
    pub const MIN_LOG_VALUE: f64 = 1e-300;

    /// Tolerance on the sum of an allocation vector
    pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

    /// Hard cap on generated window scales
    pub const MAX_SCALES: usize = 1000;
}

/// Safe floating point comparison functions
pub mod float_ops {
    /// Check if a floating point number is approximately zero with custom epsilon
    #[inline]
    pub fn approx_zero_eps(x: f64, epsilon: f64) -> bool {
        x.abs() < epsilon
    }

    /// Safe logarithm that checks for positive arguments and finite inputs
    pub fn safe_ln(x: f64) -> Option<f64> {
        if x > super::constants::MIN_LOG_VALUE && x.is_finite() {
            Some(x.ln())
        } else {
            None
        }
    }
}

/// Arithmetic mean. `NaN` for empty input.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample variance (denominator `n - 1`) by Welford's single-pass update.
///
/// Returns 0.0 for fewer than two points.
pub fn sample_variance(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let (_, m2) = welford(data);
    (m2 / (data.len() - 1) as f64).max(0.0)
}

/// Population standard deviation (denominator `n`).
///
/// Returns 0.0 for empty input.
pub fn population_std_dev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let (_, m2) = welford(data);
    (m2 / data.len() as f64).max(0.0).sqrt()
}

fn welford(data: &[f64]) -> (f64, f64) {
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (i, &value) in data.iter().enumerate() {
        let count = (i + 1) as f64;
        let delta = value - mean;
        mean += delta / count;
        m2 += delta * (value - mean);
    }
    (mean, m2)
}

/// Running sum of `data`, same length as the input.
pub fn cumulative_sum(data: &[f64]) -> Vec<f64> {
    data.iter()
        .scan(0.0, |acc, &x| {
            *acc += x;
            Some(*acc)
        })
        .collect()
}

/// Result of a simple linear regression `y = intercept + slope * x`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    /// Estimated slope
    pub slope: f64,
    /// Estimated intercept
    pub intercept: f64,
    /// Standard error of the slope; `None` with only two points
    pub slope_std_error: Option<f64>,
    /// Residuals `y - ŷ` in input order
    pub residuals: Vec<f64>,
}

/// Ordinary least squares fit of `y` on `x`.
///
/// Sums are computed on centered data. Two points give an exact fit with no
/// standard error.
///
/// # Errors
/// - `InsufficientData` for mismatched lengths or fewer than 2 points
/// - `InvalidInput` for non-finite data, a constant predictor, or a
///   non-finite fit
///
/// # Example
/// ```rust
/// use fractal_portfolio::math_utils::ols_regression;
///
/// let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
/// let y = vec![2.0, 4.0, 6.0, 8.0, 10.0];
/// let fit = ols_regression(&x, &y).unwrap();
/// assert!((fit.slope - 2.0).abs() < 1e-10);
/// ```
pub fn ols_regression(x: &[f64], y: &[f64]) -> PortfolioResult<LinearFit> {
    if x.len() != y.len() || x.len() < 2 {
        return Err(PortfolioError::InsufficientData {
            required: 2,
            actual: x.len().min(y.len()),
        });
    }

    if !x.iter().chain(y).all(|v| v.is_finite()) {
        return Err(PortfolioError::invalid_input(
            "Non-finite values in regression data",
        ));
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let sxy: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (xi - mean_x) * (yi - mean_y))
        .sum();
    let sxx: f64 = x.iter().map(|xi| (xi - mean_x) * (xi - mean_x)).sum();

    if float_ops::approx_zero_eps(sxx, constants::MIN_VARIANCE) {
        return Err(PortfolioError::invalid_input(
            "Predictor variable has zero variance",
        ));
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    if !slope.is_finite() || !intercept.is_finite() {
        return Err(PortfolioError::invalid_input(
            "Non-finite regression coefficients computed",
        ));
    }

    let residuals: Vec<f64> = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| yi - (slope * xi + intercept))
        .collect();

    let slope_std_error = if x.len() > 2 {
        let rss: f64 = residuals.iter().map(|r| r * r).sum();
        Some((rss / (n - 2.0) / sxx).sqrt()).filter(|se| se.is_finite())
    } else {
        None
    };

    Ok(LinearFit {
        slope,
        intercept,
        slope_std_error,
        residuals,
    })
}

/// Geometric sequence of integer window sizes in `[min_size, max_size]`.
///
/// Each candidate is the previous one times `growth`, rounded, and always at
/// least one more than the last size, so every iteration yields a new scale.
/// Empty when `min_size > max_size`.
pub fn geometric_window_sizes(min_size: usize, max_size: usize, growth: f64) -> Vec<usize> {
    let mut sizes = Vec::new();
    if min_size == 0 || min_size > max_size || !(growth > 1.0) {
        return sizes;
    }

    let max_f64 = max_size as f64;
    let mut current = min_size as f64;
    while current.round() <= max_f64 && sizes.len() < constants::MAX_SCALES {
        let size = current.round() as usize;
        sizes.push(size);
        current = (current * growth).max((size + 1) as f64);
    }
    sizes
}

/// Window sizes evenly spaced in `log10` between `min_size` and `max_size`.
pub fn log_spaced_window_sizes(min_size: usize, max_size: usize, step_log10: f64) -> Vec<usize> {
    if min_size == 0 || min_size > max_size || !(step_log10 > 0.0) {
        return Vec::new();
    }
    geometric_window_sizes(min_size, max_size, 10f64.powf(step_log10))
}
