//! # Fractal Portfolio
//!
//! Minimum-variance and Hurst-weighted portfolio construction from historical
//! prices.
//!
//! The crate builds two long-only allocations over a universe of assets and
//! compares them:
//!
//! - a **minimum-variance (Markowitz)** allocation solving
//!   `min wᵀΣw` subject to `Σw = 1` and per-asset bounds, and
//! - a **fractal** allocation weighting each asset in proportion to its Hurst
//!   exponent estimated by rescaled-range analysis.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fractal_portfolio::{run_comparison, PortfolioConfig, PriceSeries};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let prices: PriceSeries = load_prices()?;
//!     let report = run_comparison(&prices, &PortfolioConfig::standard())?;
//!
//!     for (asset, h) in report.hurst.available() {
//!         println!("{}: H = {:.3}", asset, h);
//!     }
//!     for row in &report.table.rows {
//!         println!("{}: prefer {}", row.asset, row.preferred);
//!     }
//!     Ok(())
//! }
//! # fn load_prices() -> Result<PriceSeries, Box<dyn std::error::Error>> { unimplemented!() }
//! ```
//!
//! ## Components
//!
//! - [`returns`]: log returns, cumulative growth, portfolio return series
//! - [`hurst`]: rescaled-range Hurst estimation with tagged soft failures
//! - [`optimizer`]: active-set minimum-variance solver
//! - [`fractal`]: Hurst-proportional weighting
//! - [`comparison`]: variation coefficients and per-asset strategy preference
//! - [`rolling`]: rolling-window minimum-variance snapshots
//! - [`pipeline`]: the end-to-end workflow
//!
//! Logging goes through the `log` facade; the crate never installs a logger.
//! Per-asset estimation and rolling windows run on rayon with the default
//! `parallel` feature.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod allocation;
pub mod config;
pub mod data;
pub mod errors;
pub mod linear_algebra;
pub mod math_utils;

// Components
pub mod comparison;
pub mod fractal;
pub mod hurst;
pub mod optimizer;
pub mod returns;
pub mod rolling;

// Orchestration and synthetic data
pub mod generators;
pub mod pipeline;

// Re-exports for convenience - main public API
pub use allocation::{AllocationSource, AllocationWeights};
pub use config::{
    BiasCorrection, ComparisonConfig, FallbackConfig, HurstConfig, OptimizerConfig,
    PortfolioConfig, RollingWindowConfig, RsMethod, WindowSchedule,
};
pub use data::{PriceSeries, ReturnMatrix, ReturnWindow};
pub use errors::{PortfolioError, PortfolioResult};
pub use linear_algebra::CovarianceMatrix;

pub use comparison::{
    build_comparison_table, variation_coefficient, ComparisonRow, ComparisonTable, Strategy,
    StrategySummary,
};
pub use hurst::{HurstEstimate, HurstEstimator, HurstReport, HurstResult, Unavailability};
pub use optimizer::{MinVarianceSolution, VarianceOptimizer};
pub use returns::{cumulative_log_growth, cumulative_returns, log_returns, portfolio_returns};
pub use rolling::{
    rolling_min_variance, AllocationTimeline, WindowAllocation, WindowArena, WindowSpec,
};

pub use pipeline::{run_comparison, ComparisonReport, StrategyPerformance};

// Data generation exports
pub use generators::{
    fractional_gaussian_noise, gaussian_random_walk, price_path_from_returns, white_noise,
    GeneratorConfig,
};
