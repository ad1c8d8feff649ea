//! Rolling minimum-variance snapshots.
//!
//! Windows are immutable `(start, end)` row ranges over one [`ReturnMatrix`].
//! A window ends at every `step`-th row and covers the trailing `window`
//! rows up to and including that row; windows with fewer than
//! `min_observations` rows are skipped. Each window is optimized
//! independently with its own covariance and solver state.

use chrono::NaiveDate;

use crate::allocation::AllocationWeights;
use crate::config::{OptimizerConfig, RollingWindowConfig};
use crate::data::{ReturnMatrix, ReturnWindow};
use crate::errors::{PortfolioError, PortfolioResult};
use crate::optimizer::VarianceOptimizer;

/// Row range `start..end` of a rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WindowSpec {
    /// First row
    pub start: usize,
    /// One past the last row
    pub end: usize,
}

impl WindowSpec {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True with no rows
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Window specs over one return matrix, in chronological order.
#[derive(Debug, Clone)]
pub struct WindowArena<'a> {
    matrix: &'a ReturnMatrix,
    specs: Vec<WindowSpec>,
}

impl<'a> WindowArena<'a> {
    /// Lay out rolling windows over `matrix`.
    ///
    /// # Errors
    /// Propagates [`RollingWindowConfig::validate`] failures.
    pub fn new(matrix: &'a ReturnMatrix, config: &RollingWindowConfig) -> PortfolioResult<Self> {
        config.validate()?;
        let specs = (0..matrix.n_rows())
            .step_by(config.step)
            .map(|last| WindowSpec {
                start: (last + 1).saturating_sub(config.window),
                end: last + 1,
            })
            .filter(|spec| spec.len() >= config.min_observations)
            .collect();
        Ok(Self { matrix, specs })
    }

    /// Window specs in order
    pub fn specs(&self) -> &[WindowSpec] {
        &self.specs
    }

    /// Borrowed view for `spec`
    pub fn view(&self, spec: WindowSpec) -> PortfolioResult<ReturnWindow<'a>> {
        self.matrix.window(spec.start, spec.end)
    }

    /// Number of windows
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// True with no windows
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Outcome of one rolling window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowAllocation {
    /// Row range
    pub spec: WindowSpec,
    /// Timestamp of the last row, the snapshot date
    pub end_timestamp: NaiveDate,
    /// Weights, or the failure for this window
    pub outcome: PortfolioResult<AllocationWeights>,
}

/// Rolling allocations in window order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AllocationTimeline {
    /// One entry per window
    pub entries: Vec<WindowAllocation>,
}

impl AllocationTimeline {
    /// Successful snapshots as `(date, weights)`
    pub fn successes(&self) -> impl Iterator<Item = (NaiveDate, &AllocationWeights)> + '_ {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.as_ref().ok().map(|w| (e.end_timestamp, w)))
    }

    /// Number of failed windows
    pub fn failure_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_err()).count()
    }

    /// All weights in order, or the first failure
    pub fn into_weights(self) -> PortfolioResult<Vec<(NaiveDate, AllocationWeights)>> {
        self.entries
            .into_iter()
            .map(|e| e.outcome.map(|w| (e.end_timestamp, w)))
            .collect()
    }

    /// Most recent successful snapshot
    pub fn latest(&self) -> Option<(NaiveDate, &AllocationWeights)> {
        self.successes().last()
    }
}

/// Minimum-variance weights for every rolling window of `matrix`.
///
/// A failing window does not stop the others; its error is kept in the
/// timeline and logged at warn level.
pub fn rolling_min_variance(
    matrix: &ReturnMatrix,
    rolling: &RollingWindowConfig,
    optimizer: &OptimizerConfig,
) -> PortfolioResult<AllocationTimeline> {
    let arena = WindowArena::new(matrix, rolling)?;

    let solve = |spec: &WindowSpec| -> WindowAllocation {
        let outcome = arena
            .view(*spec)
            .and_then(|view| VarianceOptimizer::new(optimizer.clone()).minimize_variance(&view));
        WindowAllocation {
            spec: *spec,
            end_timestamp: matrix.timestamps()[spec.end - 1],
            outcome,
        }
    };

    #[cfg(feature = "parallel")]
    let entries: Vec<WindowAllocation> = {
        use rayon::prelude::*;
        arena.specs().par_iter().map(solve).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let entries: Vec<WindowAllocation> = arena.specs().iter().map(solve).collect();

    for entry in &entries {
        if let Err(e) = &entry.outcome {
            log::warn!(
                "Rolling window ending {} (rows {}..{}) failed: {}",
                entry.end_timestamp,
                entry.spec.start,
                entry.spec.end,
                e
            );
        }
    }

    Ok(AllocationTimeline { entries })
}

/// First failure in `timeline`, if any, without consuming it.
pub fn first_failure(timeline: &AllocationTimeline) -> Option<&PortfolioError> {
    timeline.entries.iter().find_map(|e| e.outcome.as_ref().err())
}
