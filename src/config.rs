//! # Portfolio Configuration
//!
//! Explicit configuration for every component. Nothing is read from global
//! state; a [`PortfolioConfig`] is threaded through the pipeline and each
//! component takes its own section.

use std::time::Duration;

use crate::comparison::Strategy;
use crate::errors::{validate_parameter, PortfolioError, PortfolioResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How window sizes for rescaled-range analysis are generated.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WindowSchedule {
    /// Each size is the previous one times `growth`, rounded and deduplicated
    Geometric {
        /// Growth factor, must exceed 1
        growth: f64,
    },
    /// Sizes evenly spaced in `log10`
    LogSpaced {
        /// Spacing in decades, must be positive
        step_log10: f64,
    },
    /// Caller-supplied sizes; values outside the window bounds are ignored
    Explicit(Vec<usize>),
}

impl Default for WindowSchedule {
    fn default() -> Self {
        WindowSchedule::Geometric { growth: 1.1 }
    }
}

/// Statistic computed on each sub-series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RsMethod {
    /// Range of cumulative mean-adjusted increments over their standard deviation
    #[default]
    Classical,
    /// Range of the level window over the standard deviation of its increments
    RandomWalk,
    /// `max/min - 1` of the level window over the standard deviation of its
    /// percentage changes; requires strictly positive levels
    Price,
}

/// Small-sample correction applied to the regression slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BiasCorrection {
    /// Raw slope
    None,
    /// Regress on the deviation from the Anis-Lloyd expected R/S and add 0.5.
    /// Only meaningful for [`RsMethod::Classical`]; other methods use the raw slope.
    #[default]
    AnisLloyd,
    /// Subtract `0.5 / ln(N)` from the slope
    LogLength,
}

/// Hurst estimator configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HurstConfig {
    /// Minimum number of finite observations
    pub min_length: usize,
    /// Smallest window size
    pub min_window: usize,
    /// Largest window size; `None` means a quarter of the working length
    pub max_window: Option<usize>,
    /// Window size generation
    pub schedule: WindowSchedule,
    /// R/S statistic variant
    pub method: RsMethod,
    /// Slope correction
    pub bias_correction: BiasCorrection,
}

impl Default for HurstConfig {
    fn default() -> Self {
        Self {
            min_length: 100,
            min_window: 10,
            max_window: None,
            schedule: WindowSchedule::default(),
            method: RsMethod::default(),
            bias_correction: BiasCorrection::default(),
        }
    }
}

impl HurstConfig {
    /// Check all fields for consistency
    pub fn validate(&self) -> PortfolioResult<()> {
        if self.min_window < 2 {
            return Err(PortfolioError::InvalidParameter {
                parameter: "min_window".to_string(),
                value: self.min_window as f64,
                constraint: ">= 2".to_string(),
            });
        }
        if self.min_length < 2 * self.min_window {
            return Err(PortfolioError::InvalidParameter {
                parameter: "min_length".to_string(),
                value: self.min_length as f64,
                constraint: format!(">= 2 * min_window ({})", 2 * self.min_window),
            });
        }
        if let Some(max_window) = self.max_window {
            if max_window < self.min_window {
                return Err(PortfolioError::InvalidParameter {
                    parameter: "max_window".to_string(),
                    value: max_window as f64,
                    constraint: format!(">= min_window ({})", self.min_window),
                });
            }
        }
        match &self.schedule {
            WindowSchedule::Geometric { growth } => {
                if !(*growth > 1.0) || !growth.is_finite() {
                    return Err(PortfolioError::InvalidParameter {
                        parameter: "growth".to_string(),
                        value: *growth,
                        constraint: "> 1".to_string(),
                    });
                }
            }
            WindowSchedule::LogSpaced { step_log10 } => {
                if !(*step_log10 > 0.0) || !step_log10.is_finite() {
                    return Err(PortfolioError::InvalidParameter {
                        parameter: "step_log10".to_string(),
                        value: *step_log10,
                        constraint: "> 0".to_string(),
                    });
                }
            }
            WindowSchedule::Explicit(sizes) => {
                if sizes.is_empty() {
                    return Err(PortfolioError::EmptyInput {
                        context: "explicit window schedule".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Minimum-variance optimizer configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizerConfig {
    /// Lower bound on every weight
    pub lower_bound: f64,
    /// Upper bound on every weight
    pub upper_bound: f64,
    /// Stationarity tolerance, relative to the largest covariance diagonal
    pub tolerance: f64,
    /// Active-set iteration cap per attempt
    pub max_iterations: usize,
    /// Smallest-to-largest eigenvalue ratio at or below which the covariance is singular
    pub singularity_tolerance: f64,
    /// Retry once from a perturbed start after non-convergence
    pub retry_with_perturbation: bool,
    /// Size of the deterministic perturbation applied on retry
    pub perturbation: f64,
    /// Optional wall-clock budget per solve
    #[cfg_attr(feature = "serde", serde(default))]
    pub time_limit: Option<Duration>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            lower_bound: 0.0,
            upper_bound: 1.0,
            tolerance: 1e-12,
            max_iterations: 500,
            singularity_tolerance: 1e-12,
            retry_with_perturbation: true,
            perturbation: 1e-3,
            time_limit: None,
        }
    }
}

impl OptimizerConfig {
    /// Check all fields for consistency
    pub fn validate(&self) -> PortfolioResult<()> {
        validate_parameter(self.lower_bound, 0.0, 1.0, "lower_bound")?;
        validate_parameter(self.upper_bound, self.lower_bound, 1.0, "upper_bound")?;
        validate_parameter(self.tolerance, 0.0, 1e-2, "tolerance")?;
        validate_parameter(self.singularity_tolerance, 0.0, 1e-2, "singularity_tolerance")?;
        validate_parameter(self.perturbation, 0.0, 0.5, "perturbation")?;
        if self.max_iterations == 0 {
            return Err(PortfolioError::InvalidParameter {
                parameter: "max_iterations".to_string(),
                value: 0.0,
                constraint: ">= 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Rolling-window snapshot configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RollingWindowConfig {
    /// Trailing window length in rows
    pub window: usize,
    /// Distance between window end rows
    pub step: usize,
    /// Windows shorter than this are skipped
    pub min_observations: usize,
}

impl Default for RollingWindowConfig {
    fn default() -> Self {
        Self {
            window: 60,
            step: 21,
            min_observations: 30,
        }
    }
}

impl RollingWindowConfig {
    /// Check all fields for consistency
    pub fn validate(&self) -> PortfolioResult<()> {
        if self.step == 0 {
            return Err(PortfolioError::InvalidParameter {
                parameter: "step".to_string(),
                value: 0.0,
                constraint: ">= 1".to_string(),
            });
        }
        if self.min_observations < 2 || self.min_observations > self.window {
            return Err(PortfolioError::InvalidParameter {
                parameter: "min_observations".to_string(),
                value: self.min_observations as f64,
                constraint: format!("in [2, window ({})]", self.window),
            });
        }
        Ok(())
    }
}

/// Behaviour when Hurst estimates are missing.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FallbackConfig {
    /// Fraction of assets that must have an estimate for the fractal rule to
    /// apply; below it the fractal allocation falls back to uniform
    pub min_hurst_coverage: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            min_hurst_coverage: 0.0,
        }
    }
}

impl FallbackConfig {
    /// Check all fields for consistency
    pub fn validate(&self) -> PortfolioResult<()> {
        validate_parameter(self.min_hurst_coverage, 0.0, 1.0, "min_hurst_coverage")
    }
}

/// Comparison table configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComparisonConfig {
    /// Label used on ties and when both variation coefficients are undefined
    pub default_strategy: Strategy,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            default_strategy: Strategy::MinimumVariance,
        }
    }
}

/// Top-level configuration bundling every component's section.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortfolioConfig {
    /// Hurst estimation
    pub hurst: HurstConfig,
    /// Minimum-variance optimization
    pub optimizer: OptimizerConfig,
    /// Rolling snapshots
    pub rolling: RollingWindowConfig,
    /// Missing-estimate fallback
    pub fallback: FallbackConfig,
    /// Comparison table
    pub comparison: ComparisonConfig,
}

impl PortfolioConfig {
    /// Defaults matching the reference workflow: 100-point Hurst minimum,
    /// 60-row rolling windows every 21 rows
    pub fn standard() -> Self {
        Self::default()
    }

    /// Looser settings for short histories
    pub fn short_history() -> Self {
        Self {
            hurst: HurstConfig {
                min_length: 50,
                min_window: 8,
                ..HurstConfig::default()
            },
            rolling: RollingWindowConfig {
                window: 40,
                step: 10,
                min_observations: 20,
            },
            ..Self::default()
        }
    }

    /// Stricter settings: more iterations, full Hurst coverage required
    pub fn strict() -> Self {
        Self {
            hurst: HurstConfig {
                min_length: 250,
                ..HurstConfig::default()
            },
            optimizer: OptimizerConfig {
                max_iterations: 2000,
                ..OptimizerConfig::default()
            },
            fallback: FallbackConfig {
                min_hurst_coverage: 1.0,
            },
            ..Self::default()
        }
    }

    /// Validate every section
    pub fn validate(&self) -> PortfolioResult<()> {
        self.hurst.validate()?;
        self.optimizer.validate()?;
        self.rolling.validate()?;
        self.fallback.validate()
    }
}
