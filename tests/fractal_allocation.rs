//! Hurst-proportional weighting through the public API.

use std::collections::BTreeMap;

use assert_approx_eq::assert_approx_eq;
use fractal_portfolio::fractal::allocate;
use fractal_portfolio::{AllocationSource, PortfolioError};

fn exponents(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(a, h)| (a.to_string(), *h)).collect()
}

#[test]
fn test_exponents_already_summing_to_one_are_unchanged() {
    let weights = allocate(&exponents(&[("A", 0.6), ("B", 0.3), ("C", 0.1)])).unwrap();
    assert_approx_eq!(weights.get("A"), 0.6, 1e-12);
    assert_approx_eq!(weights.get("B"), 0.3, 1e-12);
    assert_approx_eq!(weights.get("C"), 0.1, 1e-12);
}

#[test]
fn test_equal_exponents_give_equal_weights() {
    let weights = allocate(&exponents(&[("A", 0.3), ("B", 0.3), ("C", 0.3)])).unwrap();
    for (_, w) in weights.iter() {
        assert_approx_eq!(w, 1.0 / 3.0, 1e-12);
    }
}

#[test]
fn test_weights_sum_to_one() {
    let weights = allocate(&exponents(&[
        ("A", 0.71),
        ("B", 0.44),
        ("C", 0.52),
        ("D", 0.38),
        ("E", 0.95),
    ]))
    .unwrap();
    assert_approx_eq!(weights.total(), 1.0, 1e-6);
    assert!(weights.iter().all(|(_, w)| w > 0.0));
    assert_eq!(weights.source(), &AllocationSource::Fractal);
    // ordering of weights follows ordering of exponents
    assert!(weights.get("E") > weights.get("A"));
    assert!(weights.get("D") < weights.get("B"));
}

#[test]
fn test_all_zero_is_degenerate() {
    let err = allocate(&exponents(&[("A", 0.0), ("B", 0.0)])).unwrap_err();
    assert!(matches!(err, PortfolioError::DegenerateInput { .. }));
}

#[test]
fn test_empty_input() {
    let err = allocate(&BTreeMap::new()).unwrap_err();
    assert!(matches!(err, PortfolioError::EmptyInput { .. }));
}

#[test]
fn test_out_of_range_exponent() {
    let err = allocate(&exponents(&[("A", 0.5), ("B", 1.5)])).unwrap_err();
    assert!(err.is_invalid_input());
}
