//! Allocation weight vectors.

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{PortfolioError, PortfolioResult};
use crate::math_utils::constants::WEIGHT_SUM_TOLERANCE;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where an allocation came from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AllocationSource {
    /// Constrained minimum-variance optimization
    MinimumVariance,
    /// Hurst-proportional weighting
    Fractal,
    /// Equal weights substituted for an allocation that could not be computed
    UniformFallback {
        /// Why the fallback was taken
        reason: String,
    },
}

impl fmt::Display for AllocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationSource::MinimumVariance => write!(f, "minimum variance"),
            AllocationSource::Fractal => write!(f, "fractal"),
            AllocationSource::UniformFallback { reason } => {
                write!(f, "uniform fallback ({})", reason)
            }
        }
    }
}

/// Asset → weight mapping.
///
/// Every weight is finite and non-negative and the weights sum to 1 within
/// `1e-6`. An asset that is not present has weight 0.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AllocationWeights {
    weights: BTreeMap<String, f64>,
    source: AllocationSource,
}

impl AllocationWeights {
    /// Validate and wrap a weight map.
    ///
    /// # Errors
    /// `EmptyInput` for an empty map; `InvalidInput` for a negative or
    /// non-finite weight or a sum away from 1.
    pub fn new(weights: BTreeMap<String, f64>, source: AllocationSource) -> PortfolioResult<Self> {
        if weights.is_empty() {
            return Err(PortfolioError::EmptyInput {
                context: "allocation weights".to_string(),
            });
        }
        if let Some((asset, w)) = weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
            return Err(PortfolioError::invalid_input(format!(
                "weight for {} must be finite and non-negative, got {}",
                asset, w
            )));
        }
        let total: f64 = weights.values().sum();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(PortfolioError::invalid_input(format!(
                "weights sum to {}, expected 1",
                total
            )));
        }
        Ok(Self { weights, source })
    }

    /// Equal weights over `assets`.
    ///
    /// # Errors
    /// `EmptyInput` when `assets` is empty.
    pub fn uniform<S: AsRef<str>>(assets: &[S], source: AllocationSource) -> PortfolioResult<Self> {
        if assets.is_empty() {
            return Err(PortfolioError::EmptyInput {
                context: "uniform allocation".to_string(),
            });
        }
        let w = 1.0 / assets.len() as f64;
        let weights = assets.iter().map(|a| (a.as_ref().to_string(), w)).collect();
        Self::new(weights, source)
    }

    /// Weight of `asset`, 0 when absent
    pub fn get(&self, asset: &str) -> f64 {
        self.weights.get(asset).copied().unwrap_or(0.0)
    }

    /// Iterate `(asset, weight)` in asset order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.weights.iter().map(|(a, w)| (a.as_str(), *w))
    }

    /// Underlying map
    pub fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    /// Provenance
    pub fn source(&self) -> &AllocationSource {
        &self.source
    }

    /// True for [`AllocationSource::UniformFallback`]
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, AllocationSource::UniformFallback { .. })
    }

    /// Number of assets with an explicit weight
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Never true for a validated allocation
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Sum of the weights
    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Weights aligned with `assets`, absent assets mapped to 0
    pub fn to_vec<S: AsRef<str>>(&self, assets: &[S]) -> Vec<f64> {
        assets.iter().map(|a| self.get(a.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn map(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(a, w)| (a.to_string(), *w)).collect()
    }

    #[test]
    fn test_new_validates_weights() {
        assert!(
            AllocationWeights::new(map(&[("A", 0.4), ("B", 0.6)]), AllocationSource::Fractal)
                .is_ok()
        );

        let err = AllocationWeights::new(map(&[("A", -0.1), ("B", 1.1)]), AllocationSource::Fractal)
            .unwrap_err();
        assert!(err.is_invalid_input());

        let err =
            AllocationWeights::new(map(&[("A", 0.4)]), AllocationSource::Fractal).unwrap_err();
        assert!(err.is_invalid_input());

        assert!(matches!(
            AllocationWeights::new(BTreeMap::new(), AllocationSource::Fractal),
            Err(PortfolioError::EmptyInput { .. })
        ));
    }

    #[test]
    fn test_absent_asset_has_zero_weight() {
        let weights =
            AllocationWeights::new(map(&[("A", 1.0)]), AllocationSource::MinimumVariance).unwrap();
        assert_eq!(weights.get("A"), 1.0);
        assert_eq!(weights.get("Z"), 0.0);
        assert_eq!(weights.to_vec(&["Z", "A"]), vec![0.0, 1.0]);
    }

    #[test]
    fn test_uniform() {
        let reason = "no Hurst estimates".to_string();
        let weights = AllocationWeights::uniform(
            &["A", "B", "C"],
            AllocationSource::UniformFallback { reason },
        )
        .unwrap();
        assert!(weights.is_fallback());
        for (_, w) in weights.iter() {
            assert_approx_eq!(w, 1.0 / 3.0, 1e-15);
        }
        assert_approx_eq!(weights.total(), 1.0, 1e-12);

        let empty: [&str; 0] = [];
        assert!(AllocationWeights::uniform(&empty, AllocationSource::Fractal).is_err());
    }

    #[test]
    fn test_source_display() {
        let src = AllocationSource::UniformFallback {
            reason: "coverage 0.25".to_string(),
        };
        assert_eq!(src.to_string(), "uniform fallback (coverage 0.25)");
        assert_eq!(AllocationSource::MinimumVariance.to_string(), "minimum variance");
    }
}
