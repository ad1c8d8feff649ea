//! Log returns and cumulative growth reproduce price relatives.

use assert_approx_eq::assert_approx_eq;
use chrono::{Duration, NaiveDate};
use fractal_portfolio::generators::{price_path_from_returns, white_noise, GeneratorConfig};
use fractal_portfolio::{cumulative_log_growth, cumulative_returns, log_returns, PriceSeries};

fn daily(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    (0..n).map(|i| start + Duration::days(i as i64)).collect()
}

#[test]
fn test_exponential_growth_recovers_price_relatives() {
    let shocks = white_noise(&GeneratorConfig {
        length: 250,
        seed: 17,
        volatility: 0.02,
    })
    .unwrap();
    let path = price_path_from_returns(42.0, &shocks).unwrap();
    let prices =
        PriceSeries::new(vec!["X".to_string()], daily(path.len()), vec![path.clone()]).unwrap();

    let returns = log_returns(&prices).unwrap();
    assert_eq!(returns.n_rows(), path.len() - 1);

    let growth = cumulative_log_growth(returns.column(0));
    for (t, g) in growth.iter().enumerate() {
        assert_approx_eq!(*g, path[t + 1] / path[0], 1e-9);
    }
}

#[test]
fn test_simple_compounding_approximates_small_moves() {
    let shocks = white_noise(&GeneratorConfig {
        length: 50,
        seed: 18,
        volatility: 0.001,
    })
    .unwrap();
    let path = price_path_from_returns(10.0, &shocks).unwrap();
    let prices = PriceSeries::new(vec!["Y".to_string()], daily(path.len()), vec![path]).unwrap();
    let returns = log_returns(&prices).unwrap();

    let simple = cumulative_returns(returns.column(0));
    let exact = cumulative_log_growth(returns.column(0));
    for (s, e) in simple.iter().zip(&exact) {
        assert!((s - e).abs() / e < 1e-3);
    }
}

#[test]
fn test_missing_prices_drop_rows_across_assets() {
    let prices = PriceSeries::new(
        vec!["A".to_string(), "B".to_string()],
        daily(6),
        vec![
            vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0],
            vec![20.0, 21.0, f64::NAN, 23.0, 24.0, 25.0],
        ],
    )
    .unwrap();

    // Unclean input: rows touching the gap are dropped
    let raw = log_returns(&prices).unwrap();
    assert_eq!(raw.n_rows(), 3);

    // Cleaned input: the gap row is removed first, so 23/21 becomes a return
    let cleaned = log_returns(&prices.cleaned()).unwrap();
    assert_eq!(cleaned.n_rows(), 4);
    assert_approx_eq!(cleaned.column(1)[1], (23.0f64 / 21.0).ln(), 1e-12);
}
