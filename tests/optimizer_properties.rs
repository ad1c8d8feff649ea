//! Properties of the minimum-variance optimizer on constructed and random data.

use assert_approx_eq::assert_approx_eq;
use chrono::{Duration, NaiveDate};
use fractal_portfolio::generators::{white_noise, GeneratorConfig};
use fractal_portfolio::{
    CovarianceMatrix, OptimizerConfig, PortfolioError, ReturnMatrix, VarianceOptimizer,
};

fn daily(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
    (0..n).map(|i| start + Duration::days(i as i64)).collect()
}

fn return_matrix(columns: Vec<Vec<f64>>) -> ReturnMatrix {
    let rows = columns[0].len();
    let assets = (0..columns.len()).map(|i| format!("ASSET{}", i)).collect();
    ReturnMatrix::new(assets, daily(rows), columns).unwrap()
}

/// Row `row` of the 8x8 Sylvester Hadamard matrix. Rows 1..8 have zero mean
/// and are mutually orthogonal.
fn hadamard_row(row: usize) -> Vec<f64> {
    (0..8)
        .map(|col| if (row & col).count_ones() % 2 == 0 { 1.0 } else { -1.0 })
        .collect()
}

/// Zero-mean, uncorrelated columns with the given sample variances.
fn uncorrelated(variances: &[f64]) -> ReturnMatrix {
    // sample variance of a Hadamard row is 8/7
    let unit = (7.0f64 / 8.0).sqrt();
    let columns = variances
        .iter()
        .enumerate()
        .map(|(k, v)| {
            hadamard_row(k + 1)
                .into_iter()
                .map(|x| x * unit * v.sqrt())
                .collect()
        })
        .collect();
    return_matrix(columns)
}

#[test]
fn test_two_uncorrelated_assets() {
    let matrix = uncorrelated(&[1.0, 4.0]);
    let cov = CovarianceMatrix::from_window(&matrix.full_window()).unwrap();
    assert_approx_eq!(cov.variance(0), 1.0, 1e-12);
    assert_approx_eq!(cov.variance(1), 4.0, 1e-12);
    assert_approx_eq!(cov.matrix()[(0, 1)], 0.0, 1e-12);

    let weights = VarianceOptimizer::default()
        .minimize_variance(&matrix.full_window())
        .unwrap();
    assert_approx_eq!(weights.get("ASSET0"), 0.8, 0.008);
    assert_approx_eq!(weights.get("ASSET1"), 0.2, 0.002);
}

#[test]
fn test_three_uncorrelated_assets() {
    let matrix = uncorrelated(&[1.0, 4.0, 9.0]);
    let weights = VarianceOptimizer::default()
        .minimize_variance(&matrix.full_window())
        .unwrap();
    assert_approx_eq!(weights.get("ASSET0"), 36.0 / 49.0, 1e-9);
    assert_approx_eq!(weights.get("ASSET1"), 9.0 / 49.0, 1e-9);
    assert_approx_eq!(weights.get("ASSET2"), 4.0 / 49.0, 1e-9);
}

#[test]
fn test_identical_assets_fail() {
    let config = GeneratorConfig {
        length: 50,
        seed: 3,
        volatility: 0.01,
    };
    let col = white_noise(&config).unwrap();
    let matrix = return_matrix(vec![col.clone(), col]);
    let err = VarianceOptimizer::default()
        .minimize_variance(&matrix.full_window())
        .unwrap_err();
    assert!(matches!(err, PortfolioError::OptimizationFailed { .. }));
}

#[test]
fn test_constant_asset_fails() {
    let config = GeneratorConfig {
        length: 50,
        seed: 4,
        volatility: 0.01,
    };
    let matrix = return_matrix(vec![white_noise(&config).unwrap(), vec![0.001; 50]]);
    let err = VarianceOptimizer::default()
        .minimize_variance(&matrix.full_window())
        .unwrap_err();
    assert!(err.is_optimization_failure());
}

#[test]
fn test_too_few_rows() {
    let matrix = return_matrix(vec![vec![0.01], vec![0.02]]);
    let err = VarianceOptimizer::default()
        .minimize_variance(&matrix.full_window())
        .unwrap_err();
    assert!(err.is_invalid_input());
}

/// Random correlated universes: weights are feasible and never worse than uniform.
#[test]
fn test_random_universes_feasible_and_improving() {
    let optimizer = VarianceOptimizer::default();

    for seed in 0..25u64 {
        let n_assets = 2 + (seed as usize % 6);
        let rows = 80;
        let market = white_noise(&GeneratorConfig {
            length: rows,
            seed: 10_000 + seed,
            volatility: 0.01,
        })
        .unwrap();

        let columns: Vec<Vec<f64>> = (0..n_assets)
            .map(|i| {
                let idio = white_noise(&GeneratorConfig {
                    length: rows,
                    seed: seed * 100 + i as u64,
                    volatility: 0.005 * (1.0 + i as f64),
                })
                .unwrap();
                let beta = 0.5 + 0.3 * i as f64;
                market.iter().zip(idio).map(|(m, e)| beta * m + e).collect()
            })
            .collect();
        let matrix = return_matrix(columns);
        let cov = CovarianceMatrix::from_window(&matrix.full_window()).unwrap();

        let solution = optimizer.solve(&cov).unwrap();
        let w = solution.weights.to_vec(cov.assets());

        assert!(w.iter().all(|&v| v >= 0.0), "seed {}: {:?}", seed, w);
        assert_approx_eq!(w.iter().sum::<f64>(), 1.0, 1e-6);

        let uniform = vec![1.0 / n_assets as f64; n_assets];
        assert!(
            solution.variance <= cov.quadratic_form(&uniform) + 1e-15,
            "seed {}: optimum worse than uniform",
            seed
        );
    }
}

#[test]
fn test_solver_is_stateless_between_calls() {
    let matrix = uncorrelated(&[1.0, 4.0, 9.0]);
    let optimizer = VarianceOptimizer::default();
    let first = optimizer.minimize_variance(&matrix.full_window()).unwrap();
    let second = optimizer.minimize_variance(&matrix.full_window()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_window_view_matches_copied_data() {
    let config = GeneratorConfig {
        length: 120,
        seed: 8,
        volatility: 0.01,
    };
    let a = white_noise(&config).unwrap();
    let b = white_noise(&GeneratorConfig { seed: 9, ..config.clone() }).unwrap();
    let matrix = return_matrix(vec![a.clone(), b.clone()]);
    let copied = return_matrix(vec![a[40..100].to_vec(), b[40..100].to_vec()]);

    let optimizer = VarianceOptimizer::new(OptimizerConfig::default());
    let from_view = optimizer
        .minimize_variance(&matrix.window(40, 100).unwrap())
        .unwrap();
    let from_copy = optimizer.minimize_variance(&copied.full_window()).unwrap();
    assert_approx_eq!(from_view.get("ASSET0"), from_copy.get("ASSET0"), 1e-12);
}
