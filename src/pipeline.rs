//! End-to-end comparison of the fractal and minimum-variance strategies.
//!
//! [`run_comparison`] performs the full workflow on a price history:
//!
//! 1. drop rows with missing prices and compute log returns
//! 2. estimate a Hurst exponent per asset
//! 3. derive fractal weights, falling back to uniform weights when too few
//!    estimates are available
//! 4. solve the full-sample minimum-variance problem
//! 5. compute rolling minimum-variance snapshots
//! 6. compute portfolio return and cumulative growth series per strategy
//! 7. summarize each strategy and build the per-asset comparison table
//!
//! Acquisition, persistence, and plotting are left to the caller.

use std::collections::BTreeMap;

use crate::allocation::{AllocationSource, AllocationWeights};
use crate::comparison::{build_comparison_table, ComparisonTable, Strategy, StrategySummary};
use crate::config::{FallbackConfig, PortfolioConfig};
use crate::data::{PriceSeries, ReturnMatrix};
use crate::errors::PortfolioResult;
use crate::fractal;
use crate::hurst::{HurstEstimator, HurstReport};
use crate::linear_algebra::CovarianceMatrix;
use crate::optimizer::{MinVarianceSolution, VarianceOptimizer};
use crate::returns::{cumulative_returns, log_returns, portfolio_returns};
use crate::rolling::{rolling_min_variance, AllocationTimeline};

/// Portfolio return and growth series of one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyPerformance {
    /// Weights applied over the whole sample
    pub weights: AllocationWeights,
    /// Weighted return per row
    pub returns: Vec<f64>,
    /// `(1 + r)` cumulative growth per row
    pub cumulative: Vec<f64>,
    /// Headline statistics
    pub summary: StrategySummary,
}

impl StrategyPerformance {
    fn evaluate(strategy: Strategy, matrix: &ReturnMatrix, weights: AllocationWeights) -> Self {
        let returns = portfolio_returns(&matrix.full_window(), &weights);
        let cumulative = cumulative_returns(&returns);
        let summary = StrategySummary::from_returns(strategy, &returns);
        Self {
            weights,
            returns,
            cumulative,
            summary,
        }
    }
}

/// Everything produced by [`run_comparison`].
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    /// Log returns of the cleaned prices
    pub returns: ReturnMatrix,
    /// Per-asset `(1 + r)` cumulative returns
    pub asset_cumulative: BTreeMap<String, Vec<f64>>,
    /// Per-asset Hurst results
    pub hurst: HurstReport,
    /// Fractal strategy
    pub fractal: StrategyPerformance,
    /// Full-sample minimum-variance strategy
    pub markowitz: StrategyPerformance,
    /// Solver diagnostics for the full-sample solve
    pub markowitz_solution: MinVarianceSolution,
    /// Rolling minimum-variance snapshots
    pub rolling: AllocationTimeline,
    /// Per-asset strategy comparison
    pub table: ComparisonTable,
}

/// Run the full comparison workflow.
///
/// # Errors
/// - invalid configuration
/// - fewer than 2 usable price rows after cleaning
/// - a degenerate fractal allocation (all available exponents zero)
/// - a full-sample minimum-variance failure
///
/// Individual Hurst estimates and rolling windows fail softly and are
/// reported inside the [`ComparisonReport`].
pub fn run_comparison(
    prices: &PriceSeries,
    config: &PortfolioConfig,
) -> PortfolioResult<ComparisonReport> {
    config.validate()?;

    let cleaned = prices.cleaned();
    log::info!(
        "Cleaned prices: {} of {} rows kept for {} assets",
        cleaned.len(),
        prices.len(),
        prices.n_assets()
    );

    let returns = log_returns(&cleaned)?;
    let asset_cumulative = returns.cumulative_returns();

    let hurst = HurstEstimator::new(config.hurst.clone()).estimate_assets(&returns);
    log::info!(
        "Hurst estimates available for {} of {} assets",
        hurst.available().len(),
        hurst.len()
    );

    let fractal_weights = fractal_or_uniform(&hurst, returns.assets(), &config.fallback)?;

    let covariance = CovarianceMatrix::from_window(&returns.full_window())?;
    let markowitz_solution = VarianceOptimizer::new(config.optimizer.clone()).solve(&covariance)?;
    log::info!(
        "Full-sample minimum variance solved in {} iterations",
        markowitz_solution.iterations
    );

    let rolling = rolling_min_variance(&returns, &config.rolling, &config.optimizer)?;
    log::info!(
        "Rolling snapshots: {} windows, {} failed",
        rolling.entries.len(),
        rolling.failure_count()
    );

    let table = build_comparison_table(
        &returns.full_window(),
        &fractal_weights,
        &markowitz_solution.weights,
        config.comparison.default_strategy,
    );

    let fractal = StrategyPerformance::evaluate(Strategy::Fractal, &returns, fractal_weights);
    let markowitz = StrategyPerformance::evaluate(
        Strategy::MinimumVariance,
        &returns,
        markowitz_solution.weights.clone(),
    );

    Ok(ComparisonReport {
        returns,
        asset_cumulative,
        hurst,
        fractal,
        markowitz,
        markowitz_solution,
        rolling,
        table,
    })
}

/// Fractal weights over the assets with an estimate, or uniform weights
/// over `assets` when nothing is available or coverage is below the
/// configured minimum.
///
/// # Errors
/// Propagates `DegenerateInput` when every available exponent is zero.
pub fn fractal_or_uniform(
    hurst: &HurstReport,
    assets: &[String],
    fallback: &FallbackConfig,
) -> PortfolioResult<AllocationWeights> {
    let available = hurst.available();
    let coverage = hurst.coverage();

    let reason = if available.is_empty() {
        Some("no Hurst estimates available".to_string())
    } else if coverage < fallback.min_hurst_coverage {
        Some(format!(
            "Hurst coverage {:.2} below required {:.2}",
            coverage, fallback.min_hurst_coverage
        ))
    } else {
        None
    };

    match reason {
        Some(reason) => {
            log::warn!("Fractal allocation falls back to uniform weights: {}", reason);
            AllocationWeights::uniform(assets, AllocationSource::UniformFallback { reason })
        }
        None => fractal::allocate(&available),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HurstConfig;
    use crate::hurst::{HurstEstimate, HurstResult, Unavailability};
    use assert_approx_eq::assert_approx_eq;

    fn estimate(h: f64) -> HurstResult {
        HurstResult::Available(HurstEstimate {
            hurst: h,
            standard_error: None,
            scales: vec![],
            observations: 200,
        })
    }

    fn too_short() -> HurstResult {
        HurstResult::Unavailable(Unavailability::TooShort {
            required: 100,
            actual: 10,
        })
    }

    fn assets() -> Vec<String> {
        vec!["A".into(), "B".into(), "C".into()]
    }

    #[test]
    fn test_fallback_when_nothing_available() {
        let report = HurstReport::new(
            assets().into_iter().map(|a| (a, too_short())).collect(),
        );
        let weights = fractal_or_uniform(&report, &assets(), &FallbackConfig::default()).unwrap();
        assert!(weights.is_fallback());
        assert_approx_eq!(weights.get("B"), 1.0 / 3.0, 1e-12);
    }

    #[test]
    fn test_partial_coverage_uses_available_assets() {
        let mut results = BTreeMap::new();
        results.insert("A".to_string(), estimate(0.6));
        results.insert("B".to_string(), estimate(0.4));
        results.insert("C".to_string(), too_short());
        let report = HurstReport::new(results);

        let weights = fractal_or_uniform(&report, &assets(), &FallbackConfig::default()).unwrap();
        assert_eq!(weights.source(), &AllocationSource::Fractal);
        assert_approx_eq!(weights.get("A"), 0.6, 1e-12);
        assert_eq!(weights.get("C"), 0.0);

        let strict = FallbackConfig {
            min_hurst_coverage: 1.0,
        };
        let weights = fractal_or_uniform(&report, &assets(), &strict).unwrap();
        assert!(weights.is_fallback());
        assert_approx_eq!(weights.get("C"), 1.0 / 3.0, 1e-12);
    }

    #[test]
    fn test_run_comparison_rejects_invalid_config() {
        let prices = PriceSeries::new(
            vec!["A".into()],
            vec![chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()],
            vec![vec![1.0]],
        )
        .unwrap();
        let config = PortfolioConfig {
            hurst: HurstConfig {
                min_window: 1,
                ..HurstConfig::default()
            },
            ..PortfolioConfig::default()
        };
        assert!(run_comparison(&prices, &config).unwrap_err().is_invalid_input());
    }
}
