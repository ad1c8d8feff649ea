//! Error types and validation functions for portfolio construction.
//!
//! Hard failures (malformed input, solver breakdown, degenerate normalization)
//! are reported through [`PortfolioError`]. Per-asset Hurst estimation never
//! produces an error; it reports [`crate::hurst::HurstResult::Unavailable`]
//! instead so a single bad series cannot abort a whole run.

use thiserror::Error;

/// Error types for return computation, estimation, and allocation.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PortfolioError {
    /// Malformed input: ragged columns, duplicate assets, unordered timestamps,
    /// non-finite values where none are allowed.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// What was wrong with the input
        reason: String,
    },

    /// Input is well-formed but too short for the requested computation.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData {
        /// Minimum required data points
        required: usize,
        /// Actual number of data points provided
        actual: usize,
    },

    /// Invalid configuration value.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// The constrained optimizer could not produce a converged allocation:
    /// singular covariance, iteration cap, or time budget exhausted.
    #[error("Optimization failed after {iterations} iterations: {reason}")]
    OptimizationFailed {
        /// Detailed reason for the failure
        reason: String,
        /// Iterations performed before giving up
        iterations: usize,
    },

    /// Input that is valid in shape but admits no well-defined answer,
    /// such as normalizing a set of weights that sums to zero.
    #[error("Degenerate input: {reason}")]
    DegenerateInput {
        /// Why the input is degenerate
        reason: String,
    },

    /// An operation that needs at least one element received none.
    #[error("Empty input: {context}")]
    EmptyInput {
        /// Operation that received the empty input
        context: String,
    },
}

impl PortfolioError {
    /// True for the invalid-input family: malformed data, too-short data,
    /// and out-of-range parameters.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            PortfolioError::InvalidInput { .. }
                | PortfolioError::InsufficientData { .. }
                | PortfolioError::InvalidParameter { .. }
        )
    }

    /// True when the error came from the variance optimizer.
    pub fn is_optimization_failure(&self) -> bool {
        matches!(self, PortfolioError::OptimizationFailed { .. })
    }

    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        PortfolioError::InvalidInput {
            reason: reason.into(),
        }
    }
}

/// Result type for portfolio operations.
///
/// This is a convenience type alias for operations that may fail with [`PortfolioError`].
pub type PortfolioResult<T> = Result<T, PortfolioError>;

/// Validates that data has sufficient length for analysis.
///
/// # Example
/// ```rust
/// use fractal_portfolio::errors::validate_data_length;
///
/// let data = vec![1.0, 2.0, 3.0];
/// assert!(validate_data_length(&data, 2).is_ok());
/// assert!(validate_data_length(&data, 5).is_err());
/// ```
pub fn validate_data_length(data: &[f64], min_required: usize) -> PortfolioResult<()> {
    if data.len() < min_required {
        Err(PortfolioError::InsufficientData {
            required: min_required,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

/// Validates that a parameter is within `[min, max]`.
///
/// # Example
/// ```rust
/// use fractal_portfolio::errors::validate_parameter;
///
/// assert!(validate_parameter(0.5, 0.0, 1.0, "lower_bound").is_ok());
/// assert!(validate_parameter(1.5, 0.0, 1.0, "lower_bound").is_err());
/// ```
pub fn validate_parameter(value: f64, min: f64, max: f64, name: &str) -> PortfolioResult<()> {
    if min.is_nan() || max.is_nan() || min > max {
        return Err(PortfolioError::invalid_input(format!(
            "Invalid bounds for parameter {}: min={}, max={}",
            name, min, max
        )));
    }

    if value.is_nan() || value < min || value > max {
        Err(PortfolioError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: format!("[{}, {}]", min, max),
        })
    } else {
        Ok(())
    }
}

/// Validates that all values in a slice are finite.
///
/// Returns on the first offending value and reports its index.
///
/// # Example
/// ```rust
/// use fractal_portfolio::errors::validate_all_finite;
///
/// assert!(validate_all_finite(&[1.0, 2.0], "returns").is_ok());
/// assert!(validate_all_finite(&[1.0, f64::NAN], "returns").is_err());
/// ```
pub fn validate_all_finite(data: &[f64], name: &str) -> PortfolioResult<()> {
    if let Some((i, value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(PortfolioError::invalid_input(format!(
            "{} contains non-finite value at index {}: {}",
            name, i, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_data_length_insufficient() {
        let data = vec![1.0, 2.0];
        match validate_data_length(&data, 5) {
            Err(PortfolioError::InsufficientData { required, actual }) => {
                assert_eq!(required, 5);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected InsufficientData error, got {:?}", other),
        }
        assert!(validate_data_length(&[1.0, 2.0, 3.0], 3).is_ok());
    }

    #[test]
    fn test_validate_parameter_out_of_range() {
        match validate_parameter(1.5, 0.0, 1.0, "upper_bound") {
            Err(PortfolioError::InvalidParameter {
                parameter,
                value,
                constraint,
            }) => {
                assert_eq!(parameter, "upper_bound");
                assert_eq!(value, 1.5);
                assert_eq!(constraint, "[0, 1]");
            }
            other => panic!("Expected InvalidParameter error, got {:?}", other),
        }

        // Boundaries are inclusive
        assert!(validate_parameter(0.0, 0.0, 1.0, "x").is_ok());
        assert!(validate_parameter(1.0, 0.0, 1.0, "x").is_ok());
    }

    #[test]
    fn test_validate_parameter_nan_and_bad_bounds() {
        assert!(matches!(
            validate_parameter(f64::NAN, 0.0, 1.0, "x"),
            Err(PortfolioError::InvalidParameter { .. })
        ));
        assert!(matches!(
            validate_parameter(0.5, 1.0, 0.0, "x"),
            Err(PortfolioError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_validate_all_finite_reports_index() {
        match validate_all_finite(&[1.0, 2.0, f64::INFINITY], "returns") {
            Err(PortfolioError::InvalidInput { reason }) => {
                assert!(reason.contains("returns"));
                assert!(reason.contains("index 2"));
            }
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
        assert!(validate_all_finite(&[], "empty").is_ok());
    }

    #[test]
    fn test_error_categories() {
        assert!(PortfolioError::InsufficientData {
            required: 2,
            actual: 1
        }
        .is_invalid_input());
        assert!(!PortfolioError::DegenerateInput {
            reason: "zero sum".to_string()
        }
        .is_invalid_input());
        assert!(PortfolioError::OptimizationFailed {
            reason: "singular".to_string(),
            iterations: 0
        }
        .is_optimization_failure());
    }

    #[test]
    fn test_error_display_formatting() {
        let err = PortfolioError::OptimizationFailed {
            reason: "covariance matrix is singular".to_string(),
            iterations: 3,
        };
        let text = err.to_string();
        assert!(text.contains("Optimization failed"));
        assert!(text.contains("3 iterations"));
        assert!(text.contains("singular"));

        let err = PortfolioError::EmptyInput {
            context: "fractal allocation".to_string(),
        };
        assert_eq!(err.to_string(), "Empty input: fractal allocation");
    }
}
