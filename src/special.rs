// SPDX-License-Identifier: AGPL-3.0-or-later
//! Special mathematical functions for held-out likelihood computation.
//!
//! Sovereign implementations of `ln_gamma` and log-sum-exp. All
//! marginal-likelihood math in this crate runs in log-space; these are the
//! primitives that keep it stable.
//!
//! # Consumers
//!
//! - [`crate::lda::estimator`] — `ln_gamma` for the Dirichlet-multinomial
//!   assignment prior, `log_sum_exp` for combining importance weights
//!
//! # References
//!
//! - Lanczos 1964 (gamma function approximation)
//! - Wallach et al. 2009, "Evaluation Methods for Topic Models" (log-domain
//!   held-out likelihood estimators)

/// Lanczos approximation for ln(Γ(x)), g = 5, n = 6 coefficients.
///
/// Accurate to ~15 significant digits for positive `x`. Returns
/// `f64::INFINITY` for non-positive `x` (poles of the gamma function).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 6] = [
        76.180_091_729_471_46,
        -86.505_320_329_416_77,
        24.014_098_240_830_91,
        -1.231_739_572_450_155,
        0.001_208_650_973_866_179,
        -5.395_239_384_953_e-6,
    ];

    if x <= 0.0 {
        return f64::INFINITY;
    }

    let g = 5.0;
    let z = x - 1.0;
    let mut sum = 0.999_999_999_999_997_1_f64;
    for (i, &c) in COEFFS.iter().enumerate() {
        sum += c / (z + 1.0 + i as f64);
    }

    let t = z + g + 0.5;
    0.5f64.mul_add((2.0 * std::f64::consts::PI).ln(), (z + 0.5) * t.ln()) - t + sum.ln()
}

/// Numerically stable log-sum-exp of a slice.
///
/// `log Σ exp(v_i)` computed without leaving log-space:
/// `max + log Σ exp(v_i - max)`.
///
/// Returns `f64::NEG_INFINITY` for an empty slice or when every entry is
/// `NEG_INFINITY` (the log of an empty sum).
#[must_use]
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max_val = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max_val == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max_val
        + values
            .iter()
            .map(|&v| (v - max_val).exp())
            .sum::<f64>()
            .ln()
}
