//! Log-probability sentinels and NaN-free arithmetic.
//!
//! Every score in the decoder is a natural-log probability or a weighted
//! sum of them. `LOG_ZERO` marks an infeasible transition and absorbs any
//! finite value it is added to.

/// Score of an infeasible transition.
pub const LOG_ZERO: f64 = f64::NEG_INFINITY;

/// Stand-in log-probability for a score a model does not provide
/// (copy-through candidates, unknown words).
pub const LOG_ALMOST_0: f64 = -18.0;

/// Natural log of a probability, with 0 mapped to `LOG_ZERO`.
pub fn log_prob(p: f64) -> f64 {
    if p > 0.0 {
        p.ln()
    } else {
        LOG_ZERO
    }
}

/// Adds two log scores. `LOG_ZERO` on either side gives `LOG_ZERO`.
pub fn log_add(a: f64, b: f64) -> f64 {
    if a == LOG_ZERO || b == LOG_ZERO {
        LOG_ZERO
    } else {
        a + b
    }
}

/// Weighted sum of log scores.
///
/// Terms with a zero weight or a zero value are skipped, so `0 * LOG_ZERO`
/// never produces NaN. A `LOG_ZERO` value under a non-zero weight makes the
/// whole product `LOG_ZERO`, whatever the sign of the weight.
pub fn dot_product(weights: &[f64], values: &[f64]) -> f64 {
    let mut sum = 0.0;
    for (&w, &v) in weights.iter().zip(values) {
        if w == 0.0 || v == 0.0 {
            continue;
        }
        if v == LOG_ZERO {
            return LOG_ZERO;
        }
        sum += w * v;
    }
    sum
}

/// True for any score other than `LOG_ZERO`.
pub fn is_feasible(score: f64) -> bool {
    score > LOG_ZERO
}
