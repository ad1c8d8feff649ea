//! Strategy comparison by variation coefficient.
//!
//! For every asset, the contribution series `r_i · w_i` is computed under
//! each strategy and summarized by its variation coefficient
//! (population standard deviation over mean). The strategy with the lower
//! coefficient is preferred for that asset.

use std::fmt;

use crate::allocation::AllocationWeights;
use crate::data::ReturnWindow;
use crate::math_utils::{mean, population_std_dev};
use crate::returns::cumulative_returns;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Allocation strategy label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Strategy {
    /// Constrained minimum-variance (Markowitz) allocation
    MinimumVariance,
    /// Hurst-proportional allocation
    Fractal,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::MinimumVariance => write!(f, "Markowitz"),
            Strategy::Fractal => write!(f, "Fractal"),
        }
    }
}

/// Population standard deviation divided by the mean.
///
/// `None` for an empty series or a mean of exactly zero. The sign follows
/// the mean.
///
/// # Example
/// ```rust
/// use fractal_portfolio::comparison::variation_coefficient;
///
/// let vc = variation_coefficient(&[1.0, 3.0]).unwrap();
/// assert!((vc - 0.5).abs() < 1e-12);
/// assert_eq!(variation_coefficient(&[-1.0, 1.0]), None);
/// ```
pub fn variation_coefficient(series: &[f64]) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    let m = mean(series);
    if m == 0.0 || !m.is_finite() {
        return None;
    }
    let vc = population_std_dev(series) / m;
    vc.is_finite().then_some(vc)
}

/// Per-asset comparison row.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComparisonRow {
    /// Asset identifier
    pub asset: String,
    /// Variation coefficient of the asset's contribution under the fractal weights
    pub vc_fractal: Option<f64>,
    /// Variation coefficient of the asset's contribution under the minimum-variance weights
    pub vc_markowitz: Option<f64>,
    /// Strategy with the lower coefficient
    pub preferred: Strategy,
}

/// Comparison rows in return-matrix asset order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComparisonTable {
    /// One row per asset
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    /// Row for `asset`
    pub fn row(&self, asset: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.asset == asset)
    }

    /// Number of assets preferring `strategy`
    pub fn count_preferred(&self, strategy: Strategy) -> usize {
        self.rows.iter().filter(|r| r.preferred == strategy).count()
    }
}

/// Lower coefficient wins; a defined coefficient beats an undefined one;
/// ties and two undefined coefficients go to `default`.
pub fn preferred_strategy(
    vc_fractal: Option<f64>,
    vc_markowitz: Option<f64>,
    default: Strategy,
) -> Strategy {
    match (vc_fractal, vc_markowitz) {
        (Some(f), Some(m)) if f < m => Strategy::Fractal,
        (Some(f), Some(m)) if m < f => Strategy::MinimumVariance,
        (Some(_), None) => Strategy::Fractal,
        (None, Some(_)) => Strategy::MinimumVariance,
        _ => default,
    }
}

/// Build the per-asset comparison over `window`.
pub fn build_comparison_table(
    window: &ReturnWindow<'_>,
    fractal: &AllocationWeights,
    markowitz: &AllocationWeights,
    default: Strategy,
) -> ComparisonTable {
    let rows = window
        .columns()
        .map(|(asset, column)| {
            let vc_fractal = contribution_vc(column, fractal.get(asset));
            let vc_markowitz = contribution_vc(column, markowitz.get(asset));
            ComparisonRow {
                asset: asset.to_string(),
                vc_fractal,
                vc_markowitz,
                preferred: preferred_strategy(vc_fractal, vc_markowitz, default),
            }
        })
        .collect();
    ComparisonTable { rows }
}

fn contribution_vc(column: &[f64], weight: f64) -> Option<f64> {
    let contribution: Vec<f64> = column.iter().map(|r| r * weight).collect();
    variation_coefficient(&contribution)
}

/// Headline statistics of one strategy's portfolio return series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StrategySummary {
    /// Strategy
    pub strategy: Strategy,
    /// Mean periodic return
    pub mean_return: f64,
    /// Population standard deviation of periodic returns
    pub volatility: f64,
    /// Variation coefficient of periodic returns
    pub variation_coefficient: Option<f64>,
    /// Last value of the `(1 + r)` cumulative series; 1.0 for an empty series
    pub final_growth: f64,
}

impl StrategySummary {
    /// Summarize a portfolio return series
    pub fn from_returns(strategy: Strategy, returns: &[f64]) -> Self {
        Self {
            strategy,
            mean_return: if returns.is_empty() { 0.0 } else { mean(returns) },
            volatility: population_std_dev(returns),
            variation_coefficient: variation_coefficient(returns),
            final_growth: cumulative_returns(returns).last().copied().unwrap_or(1.0),
        }
    }
}
