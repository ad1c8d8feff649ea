//! Seeded synthetic series for testing and validation.
//!
//! Every generator is driven by a `ChaCha20Rng` seeded from
//! [`GeneratorConfig::seed`], so the same configuration always reproduces
//! the same series.
//!
//! ## Available Generators
//!
//! - **White noise**: i.i.d. Gaussian increments
//! - **Gaussian random walk**: cumulated white noise
//! - **Fractional Gaussian noise**: exact Gaussian long-memory increments by
//!   Hosking's method (Durbin-Levinson recursion), O(n²)
//! - **Price paths**: geometric compounding of log returns

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::StandardNormal;

use crate::errors::{PortfolioError, PortfolioResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters shared by all generators.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeneratorConfig {
    /// Number of points to generate
    pub length: usize,
    /// RNG seed
    pub seed: u64,
    /// Standard deviation of each increment
    pub volatility: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            length: 1000,
            seed: 42,
            volatility: 1.0,
        }
    }
}

impl GeneratorConfig {
    fn validate(&self) -> PortfolioResult<()> {
        if self.length == 0 {
            return Err(PortfolioError::InvalidParameter {
                parameter: "length".to_string(),
                value: 0.0,
                constraint: ">= 1".to_string(),
            });
        }
        if !(self.volatility > 0.0) || !self.volatility.is_finite() {
            return Err(PortfolioError::InvalidParameter {
                parameter: "volatility".to_string(),
                value: self.volatility,
                constraint: "> 0".to_string(),
            });
        }
        Ok(())
    }

    fn rng(&self) -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(self.seed)
    }
}

fn standard_normals(rng: &mut ChaCha20Rng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.sample(StandardNormal)).collect()
}

/// I.i.d. Gaussian noise with mean 0 and standard deviation `volatility`.
pub fn white_noise(config: &GeneratorConfig) -> PortfolioResult<Vec<f64>> {
    config.validate()?;
    let mut rng = config.rng();
    Ok(standard_normals(&mut rng, config.length)
        .into_iter()
        .map(|z| config.volatility * z)
        .collect())
}

/// Random walk of `length` points starting at `start`.
pub fn gaussian_random_walk(config: &GeneratorConfig, start: f64) -> PortfolioResult<Vec<f64>> {
    let steps = white_noise(config)?;
    let mut level = start;
    let mut path = Vec::with_capacity(config.length);
    path.push(start);
    for step in steps.iter().take(config.length - 1) {
        level += step;
        path.push(level);
    }
    Ok(path)
}

/// Fractional Gaussian noise with Hurst exponent `hurst` by Hosking's method.
///
/// Each point is drawn from its exact conditional distribution given the
/// past, using the Durbin-Levinson recursion on the fGn autocovariance
/// `γ(k) = σ²/2 (|k+1|^{2H} - 2|k|^{2H} + |k-1|^{2H})`.
///
/// # Errors
/// `InvalidParameter` if `hurst` is outside the open interval (0, 1).
pub fn fractional_gaussian_noise(
    config: &GeneratorConfig,
    hurst: f64,
) -> PortfolioResult<Vec<f64>> {
    config.validate()?;
    if !(hurst > 0.0 && hurst < 1.0) {
        return Err(PortfolioError::InvalidParameter {
            parameter: "hurst".to_string(),
            value: hurst,
            constraint: "(0, 1)".to_string(),
        });
    }

    let n = config.length;
    let sigma2 = config.volatility * config.volatility;
    let two_h = 2.0 * hurst;
    let gamma = |k: usize| -> f64 {
        let k = k as f64;
        0.5 * sigma2 * ((k + 1.0).powf(two_h) - 2.0 * k.powf(two_h) + (k - 1.0).abs().powf(two_h))
    };
    let autocov: Vec<f64> = (0..n).map(gamma).collect();

    let mut rng = config.rng();
    let z = standard_normals(&mut rng, n);

    let mut x = Vec::with_capacity(n);
    x.push(autocov[0].sqrt() * z[0]);

    // phi[j - 1] holds the order-t partial regression coefficient on x[t - j]
    let mut phi: Vec<f64> = Vec::with_capacity(n);
    let mut prev: Vec<f64> = Vec::with_capacity(n);
    let mut v = autocov[0];

    for t in 1..n {
        let acc: f64 = (1..t).map(|j| prev[j - 1] * autocov[t - j]).sum();
        let phi_tt = (autocov[t] - acc) / v;

        phi.clear();
        phi.extend((1..t).map(|j| prev[j - 1] - phi_tt * prev[t - j - 1]));
        phi.push(phi_tt);

        v *= 1.0 - phi_tt * phi_tt;
        if !(v > 0.0) {
            return Err(PortfolioError::invalid_input(format!(
                "Hosking recursion lost positive variance at step {}",
                t
            )));
        }

        let mean: f64 = (1..=t).map(|j| phi[j - 1] * x[t - j]).sum();
        x.push(mean + v.sqrt() * z[t]);

        std::mem::swap(&mut phi, &mut prev);
    }

    Ok(x)
}

/// Price path `p_0, p_0·e^{r_1}, p_0·e^{r_1+r_2}, …` from log returns.
///
/// # Errors
/// `InvalidInput` if `start_price` is not a positive finite number or a
/// return is non-finite.
pub fn price_path_from_returns(start_price: f64, log_returns: &[f64]) -> PortfolioResult<Vec<f64>> {
    if !(start_price > 0.0) || !start_price.is_finite() {
        return Err(PortfolioError::invalid_input(format!(
            "start price must be positive and finite, got {}",
            start_price
        )));
    }
    crate::errors::validate_all_finite(log_returns, "log returns")?;

    let mut path = Vec::with_capacity(log_returns.len() + 1);
    path.push(start_price);
    let mut log_level = start_price.ln();
    for r in log_returns {
        log_level += r;
        path.push(log_level.exp());
    }
    Ok(path)
}
