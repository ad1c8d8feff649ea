//! Hurst-proportional ("fractal") weighting.
//!
//! Each asset receives `H_i / Σ_j H_j`. This is a heuristic: it favours
//! persistent series without any notion of risk or correlation. An asset
//! with `H < 0.5` (anti-persistent) still receives a positive weight
//! proportional to its exponent.
//!
//! Assets without an estimate are the caller's concern; see
//! [`crate::pipeline`] for the uniform fallback.

use std::collections::BTreeMap;

use crate::allocation::{AllocationSource, AllocationWeights};
use crate::errors::{PortfolioError, PortfolioResult};

/// Convert Hurst exponents into weights proportional to each exponent.
///
/// # Errors
/// - `EmptyInput` when `hurst` is empty
/// - `InvalidInput` for a value that is non-finite or outside `[0, 1]`
/// - `DegenerateInput` when the exponents sum to zero
///
/// # Example
/// ```rust
/// use std::collections::BTreeMap;
/// use fractal_portfolio::fractal::allocate;
///
/// let mut hurst = BTreeMap::new();
/// hurst.insert("A".to_string(), 0.6);
/// hurst.insert("B".to_string(), 0.4);
/// let weights = allocate(&hurst).unwrap();
/// assert!((weights.get("A") - 0.6).abs() < 1e-12);
/// ```
pub fn allocate(hurst: &BTreeMap<String, f64>) -> PortfolioResult<AllocationWeights> {
    if hurst.is_empty() {
        return Err(PortfolioError::EmptyInput {
            context: "fractal allocation".to_string(),
        });
    }

    if let Some((asset, h)) = hurst
        .iter()
        .find(|(_, h)| !h.is_finite() || **h < 0.0 || **h > 1.0)
    {
        return Err(PortfolioError::invalid_input(format!(
            "Hurst exponent for {} must lie in [0, 1], got {}",
            asset, h
        )));
    }

    let total: f64 = hurst.values().sum();
    if total <= 0.0 {
        return Err(PortfolioError::DegenerateInput {
            reason: "Hurst exponents sum to zero".to_string(),
        });
    }

    let weights = hurst
        .iter()
        .map(|(asset, h)| (asset.clone(), h / total))
        .collect();
    AllocationWeights::new(weights, AllocationSource::Fractal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn hurst(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(a, h)| (a.to_string(), *h)).collect()
    }

    #[test]
    fn test_weights_proportional_to_exponents() {
        let weights = allocate(&hurst(&[("A", 0.7), ("B", 0.5), ("C", 0.3)])).unwrap();
        assert_approx_eq!(weights.get("A"), 0.7 / 1.5, 1e-12);
        assert_approx_eq!(weights.get("B"), 0.5 / 1.5, 1e-12);
        assert_approx_eq!(weights.get("C"), 0.3 / 1.5, 1e-12);
        assert_eq!(weights.source(), &AllocationSource::Fractal);
    }

    #[test]
    fn test_zero_exponent_keeps_zero_weight() {
        let weights = allocate(&hurst(&[("A", 0.0), ("B", 0.5)])).unwrap();
        assert_eq!(weights.get("A"), 0.0);
        assert_approx_eq!(weights.get("B"), 1.0, 1e-12);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(allocate(&hurst(&[("A", 1.2)])).unwrap_err().is_invalid_input());
        assert!(allocate(&hurst(&[("A", -0.1)])).unwrap_err().is_invalid_input());
        assert!(allocate(&hurst(&[("A", f64::NAN)])).unwrap_err().is_invalid_input());
        assert!(matches!(
            allocate(&hurst(&[("A", 0.0), ("B", 0.0)])),
            Err(PortfolioError::DegenerateInput { .. })
        ));
        assert!(matches!(
            allocate(&BTreeMap::new()),
            Err(PortfolioError::EmptyInput { .. })
        ));
    }
}
