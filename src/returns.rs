//! Return computation.
//!
//! Log returns from aligned prices, cumulative growth series, and portfolio
//! return series from a weight vector.

use crate::allocation::AllocationWeights;
use crate::data::{is_valid_price, PriceSeries, ReturnMatrix, ReturnWindow};
use crate::errors::{PortfolioError, PortfolioResult};

/// Log returns `ln(p_t / p_{t-1})` for every asset.
///
/// Returns are taken between consecutive rows of `prices`. A row is dropped
/// entirely when any asset is missing a price at `t` or `t - 1`; the
/// surviving rows keep the timestamp of `t`.
///
/// # Errors
/// - `InsufficientData` with fewer than 2 complete price rows
/// - `InsufficientData` when no return row survives
///
/// # Example
/// ```rust
/// use chrono::NaiveDate;
/// use fractal_portfolio::data::PriceSeries;
/// use fractal_portfolio::returns::log_returns;
///
/// let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
/// let prices = PriceSeries::new(
///     vec!["A".to_string()],
///     vec![d(1), d(2), d(3)],
///     vec![vec![100.0, 110.0, 99.0]],
/// )
/// .unwrap();
/// let returns = log_returns(&prices).unwrap();
/// assert_eq!(returns.n_rows(), 2);
/// assert!((returns.column(0)[0] - (1.1f64).ln()).abs() < 1e-12);
/// ```
pub fn log_returns(prices: &PriceSeries) -> PortfolioResult<ReturnMatrix> {
    let complete_rows = (0..prices.len())
        .filter(|&r| prices.row_is_complete(r))
        .count();
    if complete_rows < 2 {
        return Err(PortfolioError::InsufficientData {
            required: 2,
            actual: complete_rows,
        });
    }

    let rows: Vec<usize> = (1..prices.len())
        .filter(|&t| prices.row_is_complete(t) && prices.row_is_complete(t - 1))
        .collect();
    if rows.is_empty() {
        return Err(PortfolioError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    let columns: Vec<Vec<f64>> = (0..prices.n_assets())
        .map(|a| {
            let p = prices.column(a);
            rows.iter()
                .map(|&t| log_return(p[t - 1], p[t]).unwrap_or(f64::NAN))
                .collect()
        })
        .collect();
    let timestamps = rows.iter().map(|&t| prices.timestamps()[t]).collect();

    ReturnMatrix::new(prices.assets().to_vec(), timestamps, columns)
}

/// Log return of a single price pair, `None` if either price is missing.
pub fn log_return(previous: f64, current: f64) -> Option<f64> {
    if is_valid_price(previous) && is_valid_price(current) {
        Some((current / previous).ln())
    } else {
        None
    }
}

/// Running product of `(1 + r_t)`, the growth of one unit invested.
///
/// Applied to log returns this is the compounding convention of the
/// reference workflow and approximates [`cumulative_log_growth`] for small
/// moves.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |acc, &r| {
            *acc *= 1.0 + r;
            Some(*acc)
        })
        .collect()
}

/// `exp(Σ r)` running growth; exactly `p_t / p_0` for log returns.
pub fn cumulative_log_growth(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(0.0, |acc, &r| {
            *acc += r;
            Some(acc.exp())
        })
        .collect()
}

/// Weighted sum of asset returns per row.
///
/// Assets absent from `weights` contribute nothing.
pub fn portfolio_returns(window: &ReturnWindow<'_>, weights: &AllocationWeights) -> Vec<f64> {
    let mut out = vec![0.0; window.len()];
    for (asset, column) in window.columns() {
        let w = weights.get(asset);
        if w == 0.0 {
            continue;
        }
        for (acc, r) in out.iter_mut().zip(column) {
            *acc += w * r;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::AllocationSource;
    use assert_approx_eq::assert_approx_eq;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    #[test]
    fn test_log_returns_drops_rows_with_gaps() {
        let prices = PriceSeries::new(
            vec!["A".into(), "B".into()],
            dates(5),
            vec![
                vec![100.0, 101.0, 102.0, 103.0, 104.0],
                vec![50.0, f64::NAN, 51.0, 52.0, 53.0],
            ],
        )
        .unwrap();
        let returns = log_returns(&prices).unwrap();
        // rows 1 and 2 touch the missing price
        assert_eq!(returns.n_rows(), 2);
        assert_eq!(returns.timestamps(), &[dates(5)[3], dates(5)[4]]);
        assert_approx_eq!(returns.column(1)[0], (52.0f64 / 51.0).ln(), 1e-12);
    }

    #[test]
    fn test_log_returns_too_short() {
        let prices = PriceSeries::new(vec!["A".into()], dates(1), vec![vec![100.0]]).unwrap();
        assert!(matches!(
            log_returns(&prices),
            Err(PortfolioError::InsufficientData { required: 2, actual: 1 })
        ));

        // two complete rows that are not adjacent
        let prices = PriceSeries::new(
            vec!["A".into()],
            dates(3),
            vec![vec![100.0, -1.0, 100.0]],
        )
        .unwrap();
        assert!(matches!(
            log_returns(&prices),
            Err(PortfolioError::InsufficientData { required: 1, actual: 0 })
        ));
    }

    #[test]
    fn test_log_return_pair() {
        assert_approx_eq!(log_return(100.0, 105.0).unwrap(), (1.05f64).ln(), 1e-12);
        assert_eq!(log_return(0.0, 1.0), None);
        assert_eq!(log_return(1.0, f64::INFINITY), None);
    }

    #[test]
    fn test_cumulative_series() {
        let growth = cumulative_returns(&[0.1, -0.1]);
        assert_approx_eq!(growth[0], 1.1, 1e-12);
        assert_approx_eq!(growth[1], 0.99, 1e-12);

        let prices: [f64; 4] = [100.0, 120.0, 90.0, 95.0];
        let r: Vec<f64> = prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
        let exact = cumulative_log_growth(&r);
        for (g, p) in exact.iter().zip(&prices[1..]) {
            assert_approx_eq!(*g, p / prices[0], 1e-12);
        }
        assert!(cumulative_returns(&[]).is_empty());
    }

    #[test]
    fn test_portfolio_returns_weighted_sum() {
        let matrix = ReturnMatrix::new(
            vec!["A".into(), "B".into(), "C".into()],
            dates(2),
            vec![vec![0.1, 0.2], vec![-0.1, 0.0], vec![5.0, 5.0]],
        )
        .unwrap();
        let mut w = BTreeMap::new();
        w.insert("A".to_string(), 0.5);
        w.insert("B".to_string(), 0.5);
        let weights = AllocationWeights::new(w, AllocationSource::Fractal).unwrap();

        let series = portfolio_returns(&matrix.full_window(), &weights);
        assert_approx_eq!(series[0], 0.0, 1e-12);
        assert_approx_eq!(series[1], 0.1, 1e-12);
    }
}
